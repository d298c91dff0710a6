//! Access decision function.
//!
//! Pure classification of an access attempt against a share record
//! snapshot. Mutation (committing a grant) is the metadata store's job;
//! this function only decides.

use crate::share::{Identity, ShareRecord};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Outcome of classifying one access attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The record does not exist (never did, or was destroyed).
    NotFound,
    /// The expiry deadline has passed.
    Expired,
    /// The requester is not on the allow-list.
    Blocked,
    /// A one-time link was already granted, or a deferred destruction
    /// deadline is due. Indistinguishable from destroyed for the caller.
    AlreadyConsumed,
    /// The request may proceed to a grant commit.
    Grantable,
}

impl Decision {
    /// Whether this decision permits a grant commit.
    pub fn is_grantable(&self) -> bool {
        matches!(self, Self::Grantable)
    }
}

/// Classify an access attempt. First match wins; later checks never
/// override earlier ones:
///
/// 1. absent record → `NotFound`
/// 2. past the expiry deadline → `Expired` (expiry is interpreted at
///    access time; an expired record may still physically exist)
/// 3. allow-list rejection → `Blocked`
/// 4. deferred destruction due, or one-time link already granted →
///    `AlreadyConsumed`
/// 5. otherwise → `Grantable`
pub fn evaluate(
    record: Option<&ShareRecord>,
    now: OffsetDateTime,
    requester: &Identity,
) -> Decision {
    let Some(record) = record else {
        return Decision::NotFound;
    };

    if record.is_expired(now) {
        return Decision::Expired;
    }

    if !record.allows(requester) {
        return Decision::Blocked;
    }

    if record.is_destruct_due(now) || record.is_consumed() {
        return Decision::AlreadyConsumed;
    }

    Decision::Grantable
}
