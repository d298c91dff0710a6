//! Grant committer.
//!
//! Turns a `Grantable` classification into a durable, at-most-once side
//! effect: the transactional check-and-increment in the metadata store,
//! followed by producing the content for the granted view.

use crate::error::EngineResult;
use bytes::Bytes;
use ember_core::access::Decision;
use ember_core::share::{Identity, ShareId, ShareRecord};
use ember_metadata::{GrantAttempt, ShareRepo};
use ember_storage::{BlobHandle, BlobStore};
use std::sync::Arc;
use time::OffsetDateTime;

/// A successfully committed grant with its content.
#[derive(Debug)]
pub struct CommittedGrant {
    /// The record after the commit (view count incremented, viewer log
    /// appended, due time armed if applicable).
    pub record: ShareRecord,
    /// Resolved location of the content.
    pub handle: BlobHandle,
    /// The content bytes for this one granted view, fetched before any
    /// destruction trigger may run.
    pub content: Bytes,
}

/// Outcome of driving a grant attempt to completion.
#[derive(Debug)]
pub enum GrantOutcome {
    Committed(CommittedGrant),
    Denied(Decision),
}

pub struct GrantCommitter {
    shares: Arc<dyn ShareRepo>,
    blobs: Arc<dyn BlobStore>,
}

impl GrantCommitter {
    pub fn new(shares: Arc<dyn ShareRepo>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { shares, blobs }
    }

    /// Commit a grant and materialize its content.
    ///
    /// The repository re-runs the full access decision atomically with
    /// the increment, so a lost race on a one-time link comes back as
    /// `Denied(AlreadyConsumed)`, never as a stale grant. A blob
    /// failure after the commit means the view was consumed without the
    /// requester seeing anything; that is logged as an anomaly and
    /// surfaced as a store error, not retried (retrying would grant a
    /// second view).
    pub async fn commit(
        &self,
        id: ShareId,
        requester: &Identity,
        now: OffsetDateTime,
    ) -> EngineResult<GrantOutcome> {
        let record = match self.shares.commit_grant(id, requester, now).await? {
            GrantAttempt::Committed(record) => record,
            GrantAttempt::Denied(decision) => return Ok(GrantOutcome::Denied(decision)),
        };

        let content_result = match self.blobs.resolve(&record.content_ref).await {
            Ok(handle) => match self.blobs.get(&record.content_ref).await {
                Ok(content) => Ok((handle, content)),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        match content_result {
            Ok((handle, content)) => {
                tracing::debug!(
                    share_id = %id,
                    viewer = requester.viewer_label(),
                    view_count = record.view_count,
                    "grant committed"
                );
                Ok(GrantOutcome::Committed(CommittedGrant {
                    record,
                    handle,
                    content,
                }))
            }
            Err(e) => {
                tracing::error!(
                    share_id = %id,
                    content_ref = record.content_ref.as_str(),
                    viewer = requester.viewer_label(),
                    error = %e,
                    "anomaly: view consumed but content could not be produced"
                );
                Err(e.into())
            }
        }
    }
}
