//! Blob store abstraction and backends for Ember share links.
//!
//! This crate provides:
//! - The `BlobStore` contract consumed by the lifecycle engine:
//!   put, resolve-to-handle, get, and idempotent delete-by-reference
//! - Backends: local filesystem and in-memory

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::{filesystem::FilesystemBackend, memory::MemoryBackend};
pub use error::{StorageError, StorageResult};
pub use traits::{BlobHandle, BlobStore, validate_content_ref};

use ember_core::config::StorageConfig;
use std::sync::Arc;

/// Create a blob store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn BlobStore>> {
    config.validate().map_err(StorageError::Config)?;

    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            Ok(Arc::new(backend))
        }
        StorageConfig::Memory => Ok(Arc::new(MemoryBackend::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_config_memory() {
        let store = from_config(&StorageConfig::Memory).await.unwrap();
        assert_eq!(store.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_from_config_filesystem() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = from_config(&StorageConfig::Filesystem {
            path: temp_dir.path().join("blobs"),
        })
        .await
        .unwrap();
        assert_eq!(store.backend_name(), "filesystem");
    }
}
