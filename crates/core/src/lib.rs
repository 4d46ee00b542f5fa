//! # Autoclave Nesting Core
//!
//! Data model and shared types for the autoclave nesting engine.
//!
//! This crate holds everything a caller needs to describe a nesting request and
//! to read its answer; the algorithms live in the `autoclave-nesting` crate.
//!
//! ## Core Components
//!
//! - **Inputs**: [`Piece`], [`Container`]
//! - **Geometry**: [`Rect`], [`Span`], [`Orientation`]
//! - **Outputs**: [`NestingSolution`], [`Placement`], [`Stand`], [`Exclusion`], [`Metrics`]
//! - **Configuration**: [`SolverConfig`], [`ObjectiveWeights`]
//! - **Search reporting**: [`AlgorithmStatus`], [`SearchStats`]
//!
//! ## Coordinates
//!
//! All lengths are millimetres and all weights kilograms. X runs along the plan
//! width and is the travel axis of the stands; Y runs along the plan length.
//! Placements are given by their lower-left corner.
//!
//! ## Configuration
//!
//! ```rust
//! use autoclave_nesting_core::SolverConfig;
//!
//! let config = SolverConfig::new()
//!     .with_margin(5.0)
//!     .with_grid_step(10.0)
//!     .with_time_bounds(1_000, 30_000)
//!     .with_prefer_base_level(false);
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization support

pub mod container;
pub mod error;
pub mod exact;
pub mod geometry;
pub mod piece;
pub mod placement;
pub mod result;
pub mod solver;

// Re-exports
pub use container::Container;
pub use error::{Error, Result};
pub use exact::{AlgorithmStatus, SearchStats};
pub use geometry::{Orientation, Rect, Span, EPSILON};
pub use piece::{Piece, PieceId};
pub use placement::{Level, Placement, Stand};
pub use result::{
    Exclusion, ExclusionReason, Metrics, NestingSolution, SolutionSummary, Violation,
};
pub use solver::{ObjectiveWeights, SolverConfig};
