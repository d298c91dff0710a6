//! Share record repository trait.

use crate::error::MetadataResult;
use async_trait::async_trait;
use ember_core::access::Decision;
use ember_core::share::{Identity, ShareId, ShareRecord};
use time::OffsetDateTime;

/// Outcome of one transactional grant attempt.
#[derive(Debug, Clone)]
pub enum GrantAttempt {
    /// The grant was committed; carries the updated record (view count
    /// incremented, viewer log appended, due time armed if applicable).
    Committed(ShareRecord),
    /// The evaluator denied the attempt inside the transactional unit.
    /// A requester that lost a one-time race lands here with
    /// `Decision::AlreadyConsumed`.
    Denied(Decision),
}

/// Repository for share records. The single source of truth for
/// lifecycle state; the engine holds nothing across requests.
#[async_trait]
pub trait ShareRepo: Send + Sync {
    /// Persist a new share record. The record must carry a zero view
    /// count and an empty viewer log.
    async fn create_share(&self, record: &ShareRecord) -> MetadataResult<()>;

    /// Get a share record by ID, including its viewer log.
    async fn get_share(&self, id: ShareId) -> MetadataResult<Option<ShareRecord>>;

    /// List an owner's share records, newest first.
    async fn list_shares_for_owner(&self, owner_id: &str) -> MetadataResult<Vec<ShareRecord>>;

    /// Atomically re-evaluate and commit a grant.
    ///
    /// The full access decision runs again against the current record
    /// inside one atomic unit with the increment, so two concurrent
    /// requests against a one-time record can never both observe a zero
    /// view count. A committed grant increments `view_count`, appends
    /// the requester to the viewer log, and on the first grant records
    /// `first_viewed_at` and arms `destruct_due_at` when
    /// `self_destruct_after_secs` is set.
    async fn commit_grant(
        &self,
        id: ShareId,
        requester: &Identity,
        now: OffsetDateTime,
    ) -> MetadataResult<GrantAttempt>;

    /// Delete a share record and its viewer log.
    ///
    /// Returns whether the record existed. Absence is success, not an
    /// error: deleting twice must converge on the same state.
    async fn delete_share(&self, id: ShareId) -> MetadataResult<bool>;
}
