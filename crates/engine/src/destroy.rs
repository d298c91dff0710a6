//! Destruction scheduler.
//!
//! Destruction is invoked from several racing triggers: an owner
//! delete, a one-time link firing right after its grant, a due deferred
//! deadline observed by a later access, or a repeated call against a
//! record that is already gone. Every path must converge on the same
//! terminal state without surfacing an error.

use crate::error::EngineResult;
use ember_core::share::ShareId;
use ember_metadata::ShareRepo;
use ember_storage::BlobStore;
use std::sync::Arc;

/// Executes irrecoverable destruction of a share: blob plus record.
///
/// Record removal is the authoritative "destroyed" signal. The blob
/// delete is best effort and independently retryable; a blob that
/// outlives its record is an orphan for out-of-band reclamation, never
/// re-exposed.
pub struct DestructionScheduler {
    shares: Arc<dyn ShareRepo>,
    blobs: Arc<dyn BlobStore>,
}

impl DestructionScheduler {
    pub fn new(shares: Arc<dyn ShareRepo>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { shares, blobs }
    }

    /// Destroy a share. Idempotent: a record that is already absent is
    /// success, and a missing blob is not an error.
    pub async fn destroy(&self, id: ShareId) -> EngineResult<()> {
        if let Some(record) = self.shares.get_share(id).await? {
            if let Err(e) = self.blobs.delete(&record.content_ref).await {
                // The record delete below still proceeds; the orphaned
                // blob is reclaimed out-of-band.
                tracing::warn!(
                    share_id = %id,
                    content_ref = record.content_ref.as_str(),
                    error = %e,
                    "blob delete failed during destruction"
                );
            }
        }

        let existed = self.shares.delete_share(id).await?;
        if existed {
            tracing::info!(share_id = %id, "share destroyed");
        }
        Ok(())
    }
}
