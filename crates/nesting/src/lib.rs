//! # Autoclave Nesting
//!
//! Placement engine laying out curing tools inside autoclaves.
//!
//! Pieces are rectangles with a weight and a vacuum-line demand. A container
//! has a rectangular plan, weight and line capacities and, optionally, an
//! elevated second level resting on transversal stands.
//!
//! ## Features
//!
//! - Eligibility filter with typed exclusion reasons and a reservation collaborator
//! - Exact branch-and-bound placement with a wall-clock budget and parallel subtrees
//! - Deterministic bottom-left fill heuristic on an R*-tree occupancy index
//! - Time budget and exact/heuristic strategy selection from problem size
//! - Two-level layouts with stand planning and physical validation
//! - Independent consistency checker run on every returned layout
//!
//! ## Quick Start
//!
//! ```rust
//! use autoclave_nesting::{Container, Nester, Piece, SolverConfig};
//!
//! let pieces = vec![
//!     Piece::new("T-100", 400.0, 300.0).with_weight(10.0),
//!     Piece::new("T-200", 500.0, 200.0).with_weight(8.0),
//! ];
//! let container = Container::new("AC-1", 1000.0, 1000.0)
//!     .with_max_weight(50.0)
//!     .with_line_capacity(4);
//!
//! let nester = Nester::new(SolverConfig::default().with_time_bounds(100, 1_000));
//! let solution = nester.solve(&pieces, &container).unwrap();
//!
//! assert!(solution.valid);
//! println!(
//!     "Placed {} pieces, utilization: {:.1}%",
//!     solution.placements.len(),
//!     solution.metrics.area_utilization_pct
//! );
//! ```
//!
//! ## Two Levels
//!
//! ```rust
//! use autoclave_nesting::{Container, Level, Nester, Piece, SolverConfig};
//!
//! let container = Container::new("AC-2", 1200.0, 500.0)
//!     .with_two_levels(250.0, 300.0)
//!     .with_max_stands(6);
//! let pieces: Vec<Piece> = (0..6)
//!     .map(|i| Piece::new(format!("T{}", i), 380.0, 450.0).with_weight(95.0))
//!     .collect();
//!
//! let nester = Nester::new(SolverConfig::heuristic_only());
//! let solution = nester.solve(&pieces, &container).unwrap();
//!
//! for p in solution.placements_on(Level::Upper) {
//!     assert!(solution.stands_under(&p.piece_id).len() >= 2);
//! }
//! ```

pub mod checker;
pub mod controller;
pub mod eligibility;
pub mod exact;
pub mod heuristic;
pub mod metrics;
pub mod nester;
pub mod occupancy;
pub mod orientation;
pub mod stands;
pub mod strategy;
pub mod two_level;

// Re-exports
pub use checker::ConsistencyChecker;
pub use controller::{ExecutionPlan, StrategyController};
pub use eligibility::{
    EligibilityFilter, EligibilityReport, EligiblePiece, NoReservations, ReservationOracle,
};
pub use exact::BranchAndBound;
pub use heuristic::BottomLeftFill;
pub use nester::{BatchJob, Nester};
pub use occupancy::OccupancyIndex;
pub use stands::{StandPlan, StandPlanner};
pub use strategy::{Deadline, LevelLayout, LevelRequest, PlacementStrategy, Strategy};
pub use two_level::{LayoutOutcome, TwoLevelPlanner};
pub use autoclave_nesting_core::{
    AlgorithmStatus, Container, Error, Exclusion, ExclusionReason, Level, Metrics,
    NestingSolution, ObjectiveWeights, Orientation, Piece, PieceId, Placement, Rect, Result,
    SearchStats, SolutionSummary, SolverConfig, Span, Stand, Violation,
};
