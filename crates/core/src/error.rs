//! Error types for the nesting engine.
//!
//! Only malformed input and invalid configuration surface as errors. A piece
//! that cannot be placed is never an error: it is reported as an
//! [`Exclusion`](crate::result::Exclusion) on the solution.

use thiserror::Error;

/// Result type alias for nesting operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Hard failures returned to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// A piece descriptor is malformed (non-finite or non-positive dimensions, negative weight).
    #[error("Invalid piece: {0}")]
    InvalidPiece(String),

    /// The container descriptor is malformed.
    #[error("Invalid container: {0}")]
    InvalidContainer(String),

    /// The same piece id appears more than once in one request.
    #[error("Duplicate piece id: {0}")]
    DuplicatePiece(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization error.
    #[cfg(feature = "serde")]
    #[error("Serialization error: {0}")]
    SerializationError(String),
}
