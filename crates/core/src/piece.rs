//! Piece descriptors: a curing tool carrying one work order.

use crate::geometry::Orientation;
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unique identifier for a piece.
pub type PieceId = String;

/// A rigid rectangular piece to be placed inside a container.
///
/// Pieces are immutable once built; solvers refer to them by id.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Piece {
    id: PieceId,
    width: f64,
    height: f64,
    weight: f64,
    lines_required: u32,
    rotatable: bool,
    cure_cycle_id: String,
    priority: i32,
    height_clearance: f64,
}

impl Piece {
    /// Creates a rotatable piece with the given footprint (mm, pre-rotation).
    ///
    /// Weight and clearance default to zero, one vacuum line is required.
    pub fn new(id: impl Into<PieceId>, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            weight: 0.0,
            lines_required: 1,
            rotatable: true,
            cure_cycle_id: String::new(),
            priority: 0,
            height_clearance: 0.0,
        }
    }

    /// Sets the weight in kg.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Sets the number of vacuum lines required.
    pub fn with_lines(mut self, lines: u32) -> Self {
        self.lines_required = lines;
        self
    }

    /// Allows or forbids 90 degree rotation.
    pub fn with_rotation(mut self, rotatable: bool) -> Self {
        self.rotatable = rotatable;
        self
    }

    /// Sets the cure cycle identifier.
    pub fn with_cure_cycle(mut self, cure_cycle_id: impl Into<String>) -> Self {
        self.cure_cycle_id = cure_cycle_id.into();
        self
    }

    /// Sets the priority (higher = more important).
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the vertical clearance of the piece in mm.
    pub fn with_height_clearance(mut self, clearance: f64) -> Self {
        self.height_clearance = clearance;
        self
    }

    /// Piece identifier.
    pub fn id(&self) -> &PieceId {
        &self.id
    }

    /// Declared width (mm).
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Declared height (mm).
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Weight (kg).
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Vacuum lines required.
    pub fn lines_required(&self) -> u32 {
        self.lines_required
    }

    /// Whether the piece may be rotated by 90 degrees.
    pub fn is_rotatable(&self) -> bool {
        self.rotatable
    }

    /// Cure cycle identifier (opaque).
    pub fn cure_cycle_id(&self) -> &str {
        &self.cure_cycle_id
    }

    /// Priority.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Vertical clearance (mm).
    pub fn height_clearance(&self) -> f64 {
        self.height_clearance
    }

    /// Footprint area (mm²).
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Ratio between the long and the short side (always >= 1).
    pub fn aspect_ratio(&self) -> f64 {
        let long = self.width.max(self.height);
        let short = self.width.min(self.height);
        if short > 0.0 {
            long / short
        } else {
            f64::INFINITY
        }
    }

    /// Returns true if both sides are equal, so rotation changes nothing.
    pub fn is_square(&self) -> bool {
        (self.width - self.height).abs() < crate::geometry::EPSILON
    }

    /// Effective footprint for the given orientation.
    pub fn footprint(&self, orientation: Orientation) -> (f64, f64) {
        orientation.apply(self.width, self.height)
    }

    /// Orientations the piece may be placed in.
    pub fn allowed_orientations(&self) -> Vec<Orientation> {
        if self.rotatable && !self.is_square() {
            vec![Orientation::Declared, Orientation::Rotated]
        } else {
            vec![Orientation::Declared]
        }
    }

    /// Validates the descriptor.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::InvalidPiece("piece id must not be empty".into()));
        }
        if !self.width.is_finite() || !self.height.is_finite() {
            return Err(Error::InvalidPiece(format!(
                "{}: dimensions must be finite",
                self.id
            )));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(Error::InvalidPiece(format!(
                "{}: dimensions must be positive (got {} x {})",
                self.id, self.width, self.height
            )));
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(Error::InvalidPiece(format!(
                "{}: weight must be finite and non-negative",
                self.id
            )));
        }
        if !self.height_clearance.is_finite() || self.height_clearance < 0.0 {
            return Err(Error::InvalidPiece(format!(
                "{}: height clearance must be finite and non-negative",
                self.id
            )));
        }
        Ok(())
    }
}
