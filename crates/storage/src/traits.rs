//! Blob store trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;

/// A resolved reference to stored content.
///
/// The URL is backend-specific (`file://` or `memory://`) and is what a
/// presentation layer would hand to a viewer. Resolution does not read
/// the content; use [`BlobStore::get`] for the bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobHandle {
    /// The content reference this handle resolves.
    pub content_ref: String,
    /// Content size in bytes.
    pub size: u64,
    /// Backend-specific location of the content.
    pub url: String,
}

/// Blob store abstraction for shared content bytes.
///
/// Content refs are opaque keys assigned by the uploader. Deletion is
/// idempotent: deleting an absent reference succeeds, so racing
/// destruction triggers never surface an error.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Store content under a reference, replacing any existing content.
    async fn put(&self, content_ref: &str, data: Bytes) -> StorageResult<()>;

    /// Check if content exists for a reference.
    async fn exists(&self, content_ref: &str) -> StorageResult<bool>;

    /// Resolve a reference to a content handle without reading it.
    async fn resolve(&self, content_ref: &str) -> StorageResult<BlobHandle>;

    /// Read the content for a reference.
    async fn get(&self, content_ref: &str) -> StorageResult<Bytes>;

    /// Delete the content for a reference. Absent references succeed.
    async fn delete(&self, content_ref: &str) -> StorageResult<()>;

    /// Get the name of this storage backend, for logs.
    fn backend_name(&self) -> &'static str;
}

/// Validate a content ref for use as a storage key.
///
/// Rejects refs that could escape a filesystem root. Shared by backends
/// so refs behave identically everywhere.
pub fn validate_content_ref(content_ref: &str) -> StorageResult<()> {
    if content_ref.is_empty() {
        return Err(crate::error::StorageError::InvalidContentRef(
            "empty content ref".to_string(),
        ));
    }
    if content_ref.contains("..") || content_ref.starts_with('/') || content_ref.starts_with('\\') {
        return Err(crate::error::StorageError::InvalidContentRef(format!(
            "path traversal not allowed: {content_ref}"
        )));
    }
    for component in std::path::Path::new(content_ref).components() {
        match component {
            std::path::Component::Normal(_) => {}
            _ => {
                return Err(crate::error::StorageError::InvalidContentRef(format!(
                    "contains unsafe path component: {content_ref}"
                )));
            }
        }
    }
    Ok(())
}
