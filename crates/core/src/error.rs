//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid share id: {0}")]
    InvalidShareId(String),

    #[error("invalid file kind: {0}")]
    InvalidFileKind(String),

    #[error("invalid expiry preset: {0}")]
    InvalidExpiryPreset(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
