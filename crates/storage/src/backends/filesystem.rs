//! Local filesystem blob store backend.

use crate::error::{StorageError, StorageResult};
use crate::traits::{BlobHandle, BlobStore, validate_content_ref};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// Local filesystem blob store.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend rooted at `root`.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn blob_path(&self, content_ref: &str) -> StorageResult<PathBuf> {
        validate_content_ref(content_ref)?;
        Ok(self.root.join(content_ref))
    }
}

#[async_trait]
impl BlobStore for FilesystemBackend {
    #[instrument(skip(self, data), fields(backend = self.backend_name(), size = data.len()))]
    async fn put(&self, content_ref: &str, data: Bytes) -> StorageResult<()> {
        let path = self.blob_path(content_ref)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to a temp name and rename so readers never observe a
        // partially written blob.
        let tmp = path.with_extension(format!("tmp-{}", Uuid::new_v4()));
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);

        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn exists(&self, content_ref: &str) -> StorageResult<bool> {
        let path = self.blob_path(content_ref)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn resolve(&self, content_ref: &str) -> StorageResult<BlobHandle> {
        let path = self.blob_path(content_ref)?;
        let meta = match fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(content_ref.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(BlobHandle {
            content_ref: content_ref.to_string(),
            size: meta.len(),
            url: format!("file://{}", path.display()),
        })
    }

    async fn get(&self, content_ref: &str) -> StorageResult<Bytes> {
        let path = self.blob_path(content_ref)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(content_ref.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(backend = self.backend_name()))]
    async fn delete(&self, content_ref: &str) -> StorageResult<()> {
        let path = self.blob_path(content_ref)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            // Idempotent: already reclaimed is success.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
