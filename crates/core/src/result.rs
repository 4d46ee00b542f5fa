//! Nesting solution representation.

use crate::exact::{AlgorithmStatus, SearchStats};
use crate::piece::PieceId;
use crate::placement::{Level, Placement, Stand};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Why a piece is not part of the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExclusionReason {
    /// No free position was found on any level the piece may use.
    NoFreePosition,
    /// The piece would exceed the container (or level) load.
    WeightLimitExceeded,
    /// The piece would exceed the available vacuum lines.
    LineCapacityExceeded,
    /// The piece is larger than the plan in every allowed orientation.
    DimensionExceedsContainer,
    /// The piece is already committed to another active solution.
    AlreadyReserved,
    /// No stand configuration can carry the piece on the elevated level.
    InsufficientPhysicalSupport,
    /// The piece belongs to a different cure cycle than the batch.
    IncompatibleCureCycle,
}

impl ExclusionReason {
    /// Stable upper-case code.
    pub fn code(self) -> &'static str {
        match self {
            Self::NoFreePosition => "NO_FREE_POSITION",
            Self::WeightLimitExceeded => "WEIGHT_LIMIT_EXCEEDED",
            Self::LineCapacityExceeded => "LINE_CAPACITY_EXCEEDED",
            Self::DimensionExceedsContainer => "DIMENSION_EXCEEDS_CONTAINER",
            Self::AlreadyReserved => "ALREADY_RESERVED",
            Self::InsufficientPhysicalSupport => "INSUFFICIENT_PHYSICAL_SUPPORT",
            Self::IncompatibleCureCycle => "INCOMPATIBLE_CURE_CYCLE",
        }
    }
}

impl std::fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A piece left out of the layout, with the reason.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Exclusion {
    /// The excluded piece.
    pub piece_id: PieceId,
    /// Why it was excluded.
    pub reason: ExclusionReason,
}

impl Exclusion {
    /// Creates a new exclusion.
    pub fn new(piece_id: impl Into<PieceId>, reason: ExclusionReason) -> Self {
        Self {
            piece_id: piece_id.into(),
            reason,
        }
    }
}

/// An invariant broken by a layout, as found by the consistency checker.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Violation {
    /// Two placements on one level are closer than the margin.
    Overlap {
        /// Level of both placements.
        level: Level,
        /// First piece.
        first: PieceId,
        /// Second piece.
        second: PieceId,
    },
    /// A placement leaves the plan.
    OutOfBounds {
        /// Offending piece.
        piece_id: PieceId,
    },
    /// The load on a level exceeds its cap.
    LevelWeightExceeded {
        /// Overloaded level.
        level: Level,
        /// Load on that level (kg).
        load: f64,
        /// Allowed load (kg).
        limit: f64,
    },
    /// The total load exceeds the container capacity.
    WeightExceeded {
        /// Total load (kg).
        load: f64,
        /// Allowed load (kg).
        limit: f64,
    },
    /// More vacuum lines used than available.
    LineCapacityExceeded {
        /// Lines used.
        used: u32,
        /// Lines available.
        capacity: u32,
    },
    /// A placement refers to a piece that was not in the request.
    UnknownPiece {
        /// Unknown id.
        piece_id: PieceId,
    },
    /// A piece is placed or excluded more than once.
    DuplicatePiece {
        /// Duplicated id.
        piece_id: PieceId,
    },
    /// A requested piece is neither placed nor excluded.
    MissingPiece {
        /// Missing id.
        piece_id: PieceId,
    },
    /// The placed footprint does not match the piece in the stated orientation.
    FootprintMismatch {
        /// Offending piece.
        piece_id: PieceId,
    },
    /// A non-rotatable piece appears rotated.
    RotationNotAllowed {
        /// Offending piece.
        piece_id: PieceId,
    },
    /// A level-1 placement in a container without an elevated level.
    UpperLevelUnavailable {
        /// Offending piece.
        piece_id: PieceId,
    },
    /// A level-1 piece rests on fewer than two stands.
    InsufficientSupport {
        /// Offending piece.
        piece_id: PieceId,
        /// Number of stands under it.
        stands: usize,
    },
    /// A level-1 piece has no stand under one half of its footprint.
    UnbalancedSupport {
        /// Offending piece.
        piece_id: PieceId,
    },
    /// A stand carries more than its rated load.
    StandOverloaded {
        /// Stand ordinal.
        stand: usize,
        /// Load on the stand (kg).
        load: f64,
        /// Rated load (kg).
        capacity: f64,
    },
    /// More stands than the container allows.
    TooManyStands {
        /// Stands used.
        count: usize,
        /// Allowed stands.
        limit: usize,
    },
    /// A stand leaves the plan.
    StandOutOfBounds {
        /// Stand ordinal.
        stand: usize,
    },
    /// A stand only partially underlies a level-1 piece.
    StandStraddlesPiece {
        /// Stand ordinal.
        stand: usize,
        /// Partially supported piece.
        piece_id: PieceId,
    },
    /// The supported-piece list of a stand does not match the geometry.
    StandSupportMismatch {
        /// Stand ordinal.
        stand: usize,
    },
    /// A shared stand sits at the extreme edge of one of its pieces.
    SharedStandAtEdge {
        /// Stand ordinal.
        stand: usize,
        /// Piece whose edge is too close.
        piece_id: PieceId,
    },
    /// Two stands are closer than the minimum clearance.
    StandSpacing {
        /// First stand ordinal.
        first: usize,
        /// Second stand ordinal.
        second: usize,
    },
    /// A level-0 piece is taller than the stand height but sits under level-1 material.
    ClearanceViolation {
        /// Offending level-0 piece.
        piece_id: PieceId,
    },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overlap {
                level,
                first,
                second,
            } => write!(f, "{} and {} overlap on {}", first, second, level),
            Self::OutOfBounds { piece_id } => write!(f, "{} lies outside the plan", piece_id),
            Self::LevelWeightExceeded { level, load, limit } => {
                write!(f, "{} carries {:.1} kg (limit {:.1} kg)", level, load, limit)
            }
            Self::WeightExceeded { load, limit } => {
                write!(f, "total load {:.1} kg exceeds {:.1} kg", load, limit)
            }
            Self::LineCapacityExceeded { used, capacity } => {
                write!(f, "{} lines used, {} available", used, capacity)
            }
            Self::UnknownPiece { piece_id } => write!(f, "unknown piece {}", piece_id),
            Self::DuplicatePiece { piece_id } => write!(f, "{} reported twice", piece_id),
            Self::MissingPiece { piece_id } => {
                write!(f, "{} neither placed nor excluded", piece_id)
            }
            Self::FootprintMismatch { piece_id } => {
                write!(f, "footprint of {} does not match its dimensions", piece_id)
            }
            Self::RotationNotAllowed { piece_id } => {
                write!(f, "{} is rotated but not rotatable", piece_id)
            }
            Self::UpperLevelUnavailable { piece_id } => {
                write!(f, "{} placed on level 1 of a single-level container", piece_id)
            }
            Self::InsufficientSupport { piece_id, stands } => {
                write!(f, "{} rests on {} stand(s)", piece_id, stands)
            }
            Self::UnbalancedSupport { piece_id } => {
                write!(f, "{} is cantilevered (one half unsupported)", piece_id)
            }
            Self::StandOverloaded {
                stand,
                load,
                capacity,
            } => write!(
                f,
                "stand #{} carries {:.1} kg (rated {:.1} kg)",
                stand, load, capacity
            ),
            Self::TooManyStands { count, limit } => {
                write!(f, "{} stands used, at most {} allowed", count, limit)
            }
            Self::StandOutOfBounds { stand } => write!(f, "stand #{} leaves the plan", stand),
            Self::StandStraddlesPiece { stand, piece_id } => {
                write!(f, "stand #{} straddles the edge of {}", stand, piece_id)
            }
            Self::StandSupportMismatch { stand } => {
                write!(f, "stand #{} lists the wrong pieces", stand)
            }
            Self::SharedStandAtEdge { stand, piece_id } => write!(
                f,
                "shared stand #{} sits at the extreme edge of {}",
                stand, piece_id
            ),
            Self::StandSpacing { first, second } => {
                write!(f, "stands #{} and #{} are too close", first, second)
            }
            Self::ClearanceViolation { piece_id } => {
                write!(f, "{} is too tall to sit under the elevated level", piece_id)
            }
        }
    }
}

/// Quality figures of a solution.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Metrics {
    /// Placed area over the plan area of the levels in use (%).
    pub area_utilization_pct: f64,
    /// Placed weight over the container capacity (%).
    pub weight_utilization_pct: f64,
    /// Lines used over lines available (%).
    pub line_utilization_pct: f64,
    /// Overall score in [0, 100].
    pub efficiency_score: f64,
    /// Number of placed pieces.
    pub placed_count: usize,
    /// Number of excluded pieces.
    pub excluded_count: usize,
    /// Number of level-1 placements.
    pub upper_level_count: usize,
    /// Number of stands.
    pub stand_count: usize,
    /// Total solve time (ms).
    pub computation_time_ms: u64,
    /// Statistics of the exact search, when it contributed.
    pub search: Option<SearchStats>,
    /// Invariants broken by the layout (empty for a valid solution).
    pub violations: Vec<Violation>,
}

/// Layout of one container produced by one solve call.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NestingSolution {
    /// Container the layout belongs to.
    pub container_id: String,
    /// Placed pieces.
    pub placements: Vec<Placement>,
    /// Stands under the elevated level.
    pub stands: Vec<Stand>,
    /// Pieces left out, with reasons.
    pub excluded: Vec<Exclusion>,
    /// Quality figures and audit findings.
    pub metrics: Metrics,
    /// False if the consistency checker found a violation.
    pub valid: bool,
    /// How the layout was obtained.
    pub algorithm_status: AlgorithmStatus,
}

impl NestingSolution {
    /// Creates an empty solution for a container.
    pub fn empty(container_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            placements: Vec::new(),
            stands: Vec::new(),
            excluded: Vec::new(),
            metrics: Metrics::default(),
            valid: true,
            algorithm_status: AlgorithmStatus::Optimal,
        }
    }

    /// Number of placed pieces.
    pub fn placed_count(&self) -> usize {
        self.placements.len()
    }

    /// Returns true if every requested piece was placed.
    pub fn all_placed(&self) -> bool {
        self.excluded.is_empty()
    }

    /// Looks up the placement of a piece.
    pub fn placement_of(&self, piece_id: &str) -> Option<&Placement> {
        self.placements.iter().find(|p| p.piece_id == piece_id)
    }

    /// Looks up the exclusion of a piece.
    pub fn exclusion_of(&self, piece_id: &str) -> Option<&Exclusion> {
        self.excluded.iter().find(|e| e.piece_id == piece_id)
    }

    /// Placements on one level.
    pub fn placements_on(&self, level: Level) -> impl Iterator<Item = &Placement> {
        self.placements.iter().filter(move |p| p.level == level)
    }

    /// Stands carrying the given piece.
    pub fn stands_under(&self, piece_id: &str) -> Vec<&Stand> {
        self.stands.iter().filter(|s| s.supports(piece_id)).collect()
    }

    /// Returns true if the checker accepted the layout.
    pub fn is_trustworthy(&self) -> bool {
        self.valid && self.metrics.violations.is_empty()
    }
}

/// Short summary of a solution, for logs and reports.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolutionSummary {
    /// Container id.
    pub container_id: String,
    /// Pieces placed.
    pub placed: usize,
    /// Pieces excluded.
    pub excluded: usize,
    /// Area utilization (%).
    pub area_utilization_pct: f64,
    /// Efficiency score.
    pub efficiency_score: f64,
    /// Status code.
    pub status: String,
    /// Checker verdict.
    pub valid: bool,
    /// Solve time (ms).
    pub time_ms: u64,
}

impl From<&NestingSolution> for SolutionSummary {
    fn from(solution: &NestingSolution) -> Self {
        Self {
            container_id: solution.container_id.clone(),
            placed: solution.placements.len(),
            excluded: solution.excluded.len(),
            area_utilization_pct: solution.metrics.area_utilization_pct,
            efficiency_score: solution.metrics.efficiency_score,
            status: solution.algorithm_status.code().to_string(),
            valid: solution.valid,
            time_ms: solution.metrics.computation_time_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    #[test]
    fn test_empty_solution_is_valid() {
        let solution = NestingSolution::empty("AC-1");
        assert!(solution.valid);
        assert!(solution.all_placed());
        assert_eq!(solution.placed_count(), 0);
        assert!(solution.is_trustworthy());
    }

    #[test]
    fn test_lookup_helpers() {
        let mut solution = NestingSolution::empty("AC-1");
        solution.placements.push(Placement::new(
            "A",
            Rect::new(0.0, 0.0, 10.0, 10.0),
            false,
            Level::Upper,
        ));
        solution
            .excluded
            .push(Exclusion::new("B", ExclusionReason::NoFreePosition));
        let mut stand = Stand::new(1.0, 2.0);
        stand.supported_piece_ids.push("A".into());
        solution.stands.push(stand);

        assert!(solution.placement_of("A").is_some());
        assert_eq!(
            solution.exclusion_of("B").map(|e| e.reason),
            Some(ExclusionReason::NoFreePosition)
        );
        assert_eq!(solution.placements_on(Level::Upper).count(), 1);
        assert_eq!(solution.stands_under("A").len(), 1);
        assert!(!solution.all_placed());
    }

    #[test]
    fn test_reason_codes() {
        assert_eq!(
            ExclusionReason::DimensionExceedsContainer.to_string(),
            "DIMENSION_EXCEEDS_CONTAINER"
        );
        assert_eq!(
            ExclusionReason::InsufficientPhysicalSupport.code(),
            "INSUFFICIENT_PHYSICAL_SUPPORT"
        );
    }

    #[test]
    fn test_summary_from_solution() {
        let mut solution = NestingSolution::empty("AC-9");
        solution.metrics.area_utilization_pct = 42.0;
        solution.algorithm_status = AlgorithmStatus::Heuristic;
        let summary = SolutionSummary::from(&solution);
        assert_eq!(summary.container_id, "AC-9");
        assert_eq!(summary.status, "HEURISTIC");
        assert_eq!(summary.area_utilization_pct, 42.0);
    }

    #[test]
    fn test_violation_display() {
        let v = Violation::InsufficientSupport {
            piece_id: "T7".into(),
            stands: 1,
        };
        assert_eq!(v.to_string(), "T7 rests on 1 stand(s)");
    }
}
