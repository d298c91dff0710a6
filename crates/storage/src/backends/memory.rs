//! In-memory blob store backend, for tests and embedded use.

use crate::error::{StorageError, StorageResult};
use crate::traits::{BlobHandle, BlobStore, validate_content_ref};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory blob store backed by a locked map.
#[derive(Default)]
pub struct MemoryBackend {
    blobs: RwLock<HashMap<String, Bytes>>,
}

impl MemoryBackend {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read_map(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Bytes>> {
        // Lock poisoning only happens if a writer panicked; the map
        // itself is still consistent for these whole-value operations.
        self.blobs.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_map(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Bytes>> {
        self.blobs.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl BlobStore for MemoryBackend {
    async fn put(&self, content_ref: &str, data: Bytes) -> StorageResult<()> {
        validate_content_ref(content_ref)?;
        self.write_map().insert(content_ref.to_string(), data);
        Ok(())
    }

    async fn exists(&self, content_ref: &str) -> StorageResult<bool> {
        validate_content_ref(content_ref)?;
        Ok(self.read_map().contains_key(content_ref))
    }

    async fn resolve(&self, content_ref: &str) -> StorageResult<BlobHandle> {
        validate_content_ref(content_ref)?;
        let map = self.read_map();
        let data = map
            .get(content_ref)
            .ok_or_else(|| StorageError::NotFound(content_ref.to_string()))?;
        Ok(BlobHandle {
            content_ref: content_ref.to_string(),
            size: data.len() as u64,
            url: format!("memory://{content_ref}"),
        })
    }

    async fn get(&self, content_ref: &str) -> StorageResult<Bytes> {
        validate_content_ref(content_ref)?;
        self.read_map()
            .get(content_ref)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(content_ref.to_string()))
    }

    async fn delete(&self, content_ref: &str) -> StorageResult<()> {
        validate_content_ref(content_ref)?;
        self.write_map().remove(content_ref);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
