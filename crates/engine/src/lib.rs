//! Lifecycle and access-control engine for Ember share links.
//!
//! A share link self-limits its own availability: it expires at a
//! deadline, may be restricted to named recipients, and may destroy
//! itself after being viewed once or after a countdown armed by the
//! first view. This crate decides, for any access attempt, whether to
//! grant, deny, or destroy, and drives the irreversible destruction of
//! content.
//!
//! The engine holds no state across requests; the metadata store is the
//! single source of truth and the blob store holds the content bytes.
//! Identity, transport, and rendering live elsewhere.

pub mod destroy;
pub mod error;
pub mod grant;

pub use destroy::DestructionScheduler;
pub use error::{EngineError, EngineResult};
pub use grant::{CommittedGrant, GrantCommitter, GrantOutcome};

use ember_core::access::{Decision, evaluate};
use ember_core::expiry::{ExpiryRule, resolve_expiry};
use ember_core::share::{FileKind, Identity, ShareId, ShareRecord, normalize_identity};
use ember_metadata::ShareRepo;
use ember_storage::BlobStore;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::instrument;

/// Request to create a share.
#[derive(Clone, Debug)]
pub struct CreateShareRequest {
    pub owner_id: String,
    pub content_ref: String,
    pub file_name: String,
    pub file_kind: FileKind,
    pub expiry: ExpiryRule,
    pub allow_list: Vec<String>,
    pub self_destruct_on_view: bool,
    pub self_destruct_after_secs: Option<u32>,
}

/// A created share record, with a flag for the expiry fallback so the
/// caller can warn the user that the share is shorter than intended.
#[derive(Clone, Debug)]
pub struct CreatedShare {
    pub record: ShareRecord,
    pub expiry_fell_back: bool,
}

/// Terminal result of one access request.
///
/// Every variant is a normal, expected business state. Callers must
/// keep them distinguishable: "gone", "not allowed", "expired", and
/// "already viewed" require different user actions.
#[derive(Debug)]
pub enum AccessOutcome {
    /// The grant was committed; carries the content for this one view.
    Granted(CommittedGrant),
    /// The record does not exist or was destroyed.
    NotFound,
    /// The expiry deadline has passed.
    Expired,
    /// The requester is not on the allow-list.
    Blocked,
    /// A one-time link was already viewed, or a deferred destruction
    /// deadline is due.
    AlreadyConsumed,
}

/// Terminal result of one delete request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The record existed and destruction ran.
    Deleted,
    /// The record was already gone; deletion is idempotent, so this is
    /// a no-op success rather than a failure.
    NotFound,
    /// The requester is not the owner.
    Blocked,
}

/// The access-request pipeline: evaluator, grant committer, and
/// destruction scheduler over a record repository and a blob store.
pub struct LifecycleEngine {
    shares: Arc<dyn ShareRepo>,
    committer: GrantCommitter,
    destroyer: DestructionScheduler,
}

impl LifecycleEngine {
    pub fn new(shares: Arc<dyn ShareRepo>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            committer: GrantCommitter::new(Arc::clone(&shares), Arc::clone(&blobs)),
            destroyer: DestructionScheduler::new(Arc::clone(&shares), blobs),
            shares,
        }
    }

    /// Create a share record.
    ///
    /// Applies the expiry resolver and validates the policy before
    /// anything is persisted: the deadline must land after `now`,
    /// allow-list entries are normalized (trimmed, case-folded, empties
    /// dropped), and a deferred self-destruct delay must be positive.
    #[instrument(skip(self, request), fields(owner = request.owner_id.as_str()))]
    pub async fn create_share(
        &self,
        request: CreateShareRequest,
        now: OffsetDateTime,
    ) -> EngineResult<CreatedShare> {
        let owner_id = normalize_identity(&request.owner_id);
        if owner_id.is_empty() {
            return Err(EngineError::InvariantViolation(
                "owner_id must be non-empty".to_string(),
            ));
        }
        ember_storage::validate_content_ref(&request.content_ref)
            .map_err(|e| EngineError::InvariantViolation(e.to_string()))?;
        if let Some(0) = request.self_destruct_after_secs {
            return Err(EngineError::InvariantViolation(
                "self_destruct_after_secs must be positive".to_string(),
            ));
        }

        let resolved = resolve_expiry(&request.expiry, now);
        if resolved.expires_at <= now {
            return Err(EngineError::InvariantViolation(format!(
                "expiry {} does not land after creation time {now}",
                resolved.expires_at
            )));
        }

        let allow_list = request
            .allow_list
            .iter()
            .map(|entry| normalize_identity(entry))
            .filter(|entry| !entry.is_empty())
            .collect();

        let record = ShareRecord {
            id: ShareId::new(),
            owner_id,
            content_ref: request.content_ref,
            file_name: request.file_name,
            file_kind: request.file_kind,
            created_at: now,
            expires_at: resolved.expires_at,
            allow_list,
            self_destruct_on_view: request.self_destruct_on_view,
            self_destruct_after_secs: request.self_destruct_after_secs,
            view_count: 0,
            viewer_log: Vec::new(),
            first_viewed_at: None,
            destruct_due_at: None,
        };
        self.shares.create_share(&record).await?;

        tracing::info!(
            share_id = %record.id,
            expires_at = %record.expires_at,
            one_time = record.self_destruct_on_view,
            "share created"
        );
        Ok(CreatedShare {
            record,
            expiry_fell_back: resolved.fell_back,
        })
    }

    /// Run one access request through the pipeline.
    ///
    /// Terminal classifications return without mutation. A `Grantable`
    /// snapshot goes to the grant committer, whose transactional
    /// re-evaluation is what actually decides; this pre-check only
    /// avoids pointless commit attempts. One-time links are destroyed
    /// synchronously after their single grant's content is produced,
    /// and an observed due deadline triggers destruction so the
    /// physical state converges without a background sweep.
    #[instrument(skip(self), fields(share_id = %id, viewer = requester.viewer_label()))]
    pub async fn request_access(
        &self,
        id: ShareId,
        requester: &Identity,
        now: OffsetDateTime,
    ) -> EngineResult<AccessOutcome> {
        let record = self.shares.get_share(id).await?;
        let decision = evaluate(record.as_ref(), now, requester);

        if decision == Decision::AlreadyConsumed {
            if let Some(record) = &record {
                if record.is_destruct_due(now) {
                    self.destroyer.destroy(id).await?;
                }
            }
        }
        if !decision.is_grantable() {
            return Ok(Self::denial(decision));
        }

        match self.committer.commit(id, requester, now).await? {
            GrantOutcome::Denied(decision) => Ok(Self::denial(decision)),
            GrantOutcome::Committed(grant) => {
                if grant.record.self_destruct_on_view {
                    // The content for this one grant is already in hand.
                    self.destroyer.destroy(id).await?;
                }
                Ok(AccessOutcome::Granted(grant))
            }
        }
    }

    /// Delete a share on the owner's behalf.
    #[instrument(skip(self), fields(share_id = %id, requester = requester.viewer_label()))]
    pub async fn request_delete(
        &self,
        id: ShareId,
        requester: &Identity,
    ) -> EngineResult<DeleteOutcome> {
        let Some(record) = self.shares.get_share(id).await? else {
            return Ok(DeleteOutcome::NotFound);
        };
        let is_owner =
            matches!(requester, Identity::Known(who) if normalize_identity(who) == record.owner_id);
        if !is_owner {
            return Ok(DeleteOutcome::Blocked);
        }

        self.destroyer.destroy(id).await?;
        Ok(DeleteOutcome::Deleted)
    }

    /// List an owner's shares, newest first.
    pub async fn shares_for_owner(&self, owner_id: &str) -> EngineResult<Vec<ShareRecord>> {
        let records = self
            .shares
            .list_shares_for_owner(&normalize_identity(owner_id))
            .await?;
        Ok(records)
    }

    fn denial(decision: Decision) -> AccessOutcome {
        match decision {
            Decision::NotFound => AccessOutcome::NotFound,
            Decision::Expired => AccessOutcome::Expired,
            Decision::Blocked => AccessOutcome::Blocked,
            Decision::AlreadyConsumed => AccessOutcome::AlreadyConsumed,
            Decision::Grantable => unreachable!("grantable is not a denial"),
        }
    }
}
