//! Shared harness for engine integration tests.

use bytes::Bytes;
use ember_core::expiry::{ExpiryPreset, ExpiryRule};
use ember_core::share::FileKind;
use ember_engine::{CreateShareRequest, LifecycleEngine};
use ember_metadata::SqliteStore;
use ember_storage::{BlobStore, MemoryBackend};
use std::sync::Arc;

/// An engine wired to a temp-dir SQLite store and an in-memory blob
/// store, with helpers for seeding content.
pub struct TestEngine {
    pub engine: Arc<LifecycleEngine>,
    pub blobs: Arc<MemoryBackend>,
    pub shares: Arc<SqliteStore>,
    _temp_dir: tempfile::TempDir,
}

impl TestEngine {
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("tempdir");
        let shares = Arc::new(
            SqliteStore::new(temp_dir.path().join("shares.db"))
                .await
                .expect("sqlite store"),
        );
        let blobs = Arc::new(MemoryBackend::new());
        let engine = Arc::new(LifecycleEngine::new(
            Arc::clone(&shares) as Arc<dyn ember_metadata::ShareRepo>,
            Arc::clone(&blobs) as Arc<dyn BlobStore>,
        ));
        Self {
            engine,
            blobs,
            shares,
            _temp_dir: temp_dir,
        }
    }

    /// Seed a blob and return a create request pointing at it.
    pub async fn seed_request(&self, owner: &str) -> CreateShareRequest {
        let content_ref = format!("uploads/{owner}/{}", uuid_like());
        self.blobs
            .put(&content_ref, Bytes::from_static(b"the secret payload"))
            .await
            .expect("seed blob");
        CreateShareRequest {
            owner_id: owner.to_string(),
            content_ref,
            file_name: "secret.png".to_string(),
            file_kind: FileKind::Image,
            expiry: ExpiryRule::Preset(ExpiryPreset::OneHour),
            allow_list: Vec::new(),
            self_destruct_on_view: false,
            self_destruct_after_secs: None,
        }
    }
}

fn uuid_like() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    format!("blob-{}", COUNTER.fetch_add(1, Ordering::Relaxed))
}
