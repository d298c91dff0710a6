//! Blob store error types.

use thiserror::Error;

/// Blob store operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid content ref: {0}")]
    InvalidContentRef(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl StorageError {
    /// Whether the failure is a transient I/O condition worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

/// Result type for blob store operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
