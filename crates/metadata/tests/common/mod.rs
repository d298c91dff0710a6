//! Shared test harness for metadata store tests.

use ember_core::share::{FileKind, ShareId, ShareRecord};
use ember_metadata::SqliteStore;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};

/// A SQLite store backed by a temp directory that lives as long as the
/// harness.
pub struct TestMetadata {
    store: Arc<SqliteStore>,
    _temp_dir: tempfile::TempDir,
}

impl TestMetadata {
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("tempdir");
        let store = SqliteStore::new(temp_dir.path().join("shares.db"))
            .await
            .expect("sqlite store");
        Self {
            store: Arc::new(store),
            _temp_dir: temp_dir,
        }
    }

    pub fn store(&self) -> Arc<SqliteStore> {
        Arc::clone(&self.store)
    }
}

/// A fresh unviewed record expiring one hour from `now`.
pub fn sample_record(now: OffsetDateTime, owner: &str) -> ShareRecord {
    ShareRecord {
        id: ShareId::new(),
        owner_id: owner.to_string(),
        content_ref: format!("uploads/{owner}/{}", ShareId::new()),
        file_name: "holiday.png".to_string(),
        file_kind: FileKind::Image,
        created_at: now,
        expires_at: now + Duration::hours(1),
        allow_list: Default::default(),
        self_destruct_on_view: false,
        self_destruct_after_secs: None,
        view_count: 0,
        viewer_log: Vec::new(),
        first_viewed_at: None,
        destruct_due_at: None,
    }
}
