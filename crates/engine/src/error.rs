//! Engine error types.
//!
//! Terminal access classifications are not errors here; they travel as
//! typed outcomes. This taxonomy covers only genuine failures: invariant
//! violations caught before persistence, and store-layer I/O.

use ember_metadata::MetadataError;
use ember_storage::StorageError;
use thiserror::Error;

/// Lifecycle engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("metadata store error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("blob store error: {0}")]
    Storage(#[from] StorageError),
}

impl EngineError {
    /// Whether the whole request is safe to retry.
    ///
    /// True for store-layer failures where no partial grant occurred.
    /// A blob failure after a committed grant is logged as an anomaly by
    /// the engine; retrying it would break at-most-once, so callers
    /// should check their logs before retrying storage errors blindly.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::InvariantViolation(_) => false,
            Self::Metadata(e) => e.is_transient(),
            Self::Storage(e) => e.is_transient(),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
