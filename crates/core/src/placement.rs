//! Placements and stands: the geometric content of a solution.

use crate::geometry::{Rect, Span};
use crate::piece::PieceId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Vertical level inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Level {
    /// The base plan (level 0).
    #[default]
    Base,
    /// The elevated plane resting on stands (level 1).
    Upper,
}

impl Level {
    /// Numeric level index (0 or 1).
    pub fn index(self) -> u8 {
        match self {
            Self::Base => 0,
            Self::Upper => 1,
        }
    }

    /// Both levels, base first.
    pub fn all() -> [Level; 2] {
        [Level::Base, Level::Upper]
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "L{}", self.index())
    }
}

/// Position of one piece inside a container.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Placement {
    /// The placed piece.
    pub piece_id: PieceId,
    /// Lower-left X (mm).
    pub x: f64,
    /// Lower-left Y (mm).
    pub y: f64,
    /// Effective footprint along X, after rotation (mm).
    pub width: f64,
    /// Effective footprint along Y, after rotation (mm).
    pub height: f64,
    /// Whether the piece is rotated by 90 degrees.
    pub rotated: bool,
    /// Level the piece rests on.
    pub level: Level,
}

impl Placement {
    /// Creates a placement from a footprint rectangle.
    pub fn new(piece_id: impl Into<PieceId>, rect: Rect, rotated: bool, level: Level) -> Self {
        Self {
            piece_id: piece_id.into(),
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            rotated,
            level,
        }
    }

    /// Footprint rectangle.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Projection onto the stand travel axis (X).
    pub fn x_span(&self) -> Span {
        Span::with_length(self.x, self.width)
    }

    /// Footprint area (mm²).
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Returns a copy moved to another level.
    pub fn on_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

/// A transversal support under the elevated level.
///
/// A stand occupies `[x, x + width_along_axis]` along the travel axis (X) and
/// spans the full plan length along Y.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Stand {
    /// Start of the stand along the travel axis (mm).
    pub x: f64,
    /// Width of the stand along the travel axis (mm).
    pub width_along_axis: f64,
    /// Level-1 pieces resting on this stand, sorted.
    pub supported_piece_ids: Vec<PieceId>,
    /// Ordinal of the stand along the travel axis.
    pub sequence_index: usize,
}

impl Stand {
    /// Creates a stand with no supported pieces yet.
    pub fn new(x: f64, width_along_axis: f64) -> Self {
        Self {
            x,
            width_along_axis,
            supported_piece_ids: Vec::new(),
            sequence_index: 0,
        }
    }

    /// Extent along the travel axis.
    pub fn span(&self) -> Span {
        Span::with_length(self.x, self.width_along_axis)
    }

    /// Centre along the travel axis.
    pub fn center(&self) -> f64 {
        self.x + self.width_along_axis / 2.0
    }

    /// Floor footprint of the stand in a container of the given plan length.
    pub fn footprint(&self, plan_length: f64) -> Rect {
        Rect::new(self.x, 0.0, self.width_along_axis, plan_length)
    }

    /// Returns true if the stand carries the given piece.
    pub fn supports(&self, piece_id: &str) -> bool {
        self.supported_piece_ids.iter().any(|id| id == piece_id)
    }

    /// Returns true if more than one piece rests on the stand.
    pub fn is_shared(&self) -> bool {
        self.supported_piece_ids.len() > 1
    }
}
