//! Share record types and access policy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use time::OffsetDateTime;
use uuid::Uuid;

/// Viewer-log marker for accesses made without a signed-in identity.
pub const ANONYMOUS_VIEWER: &str = "public-link";

/// Unique identifier for a share record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShareId(Uuid);

impl ShareId {
    /// Generate a new random share ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from a string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::Error::InvalidShareId(format!("{s}: {e}")))
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ShareId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ShareId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Debug for ShareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShareId({})", self.0)
    }
}

impl fmt::Display for ShareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of shared content, used by viewers to pick a renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Video,
    Document,
}

impl FileKind {
    /// Parse from string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "document" => Ok(Self::Document),
            _ => Err(crate::Error::InvalidFileKind(s.to_string())),
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Document => "document",
        }
    }

    /// Infer the kind from a MIME type. Anything that is not an image
    /// or a video is treated as a document.
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            Self::Image
        } else if mime.starts_with("video/") {
            Self::Video
        } else {
            Self::Document
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Requester identity supplied by the identity source.
///
/// Identities are opaque strings (typically e-mail addresses);
/// matching against allow-lists is case-insensitive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Identity {
    /// No signed-in identity; the request came through a bare link.
    Anonymous,
    /// A known requester identity.
    Known(String),
}

impl Identity {
    /// Build a known identity, normalizing it for allow-list matching.
    pub fn known(s: impl Into<String>) -> Self {
        Self::Known(normalize_identity(&s.into()))
    }

    /// The label recorded in the viewer log for this identity.
    pub fn viewer_label(&self) -> &str {
        match self {
            Self::Anonymous => ANONYMOUS_VIEWER,
            Self::Known(s) => s,
        }
    }

    /// Whether this identity matches a stored (already normalized) one.
    pub fn matches(&self, stored: &str) -> bool {
        match self {
            Self::Anonymous => false,
            Self::Known(s) => normalize_identity(s) == stored,
        }
    }
}

/// Normalize an identity for storage and comparison: trim and case-fold.
pub fn normalize_identity(s: &str) -> String {
    s.trim().to_lowercase()
}

/// One entry in a record's append-only viewer log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerEntry {
    /// Viewer label (normalized identity or the anonymous marker).
    pub viewer: String,
    /// When the grant was committed.
    #[serde(with = "time::serde::rfc3339")]
    pub viewed_at: OffsetDateTime,
}

/// The persisted description of one shared file and its access policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShareRecord {
    /// Unique identifier, assigned at creation.
    pub id: ShareId,
    /// Identity of the creator.
    pub owner_id: String,
    /// Opaque reference into the blob store.
    pub content_ref: String,
    /// Original file name, for display only.
    pub file_name: String,
    /// Content kind.
    pub file_kind: FileKind,
    /// When the record was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the record expires. Always after `created_at`.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    /// Normalized recipient identities. Empty means anyone may attempt
    /// access, including anonymous requesters.
    pub allow_list: BTreeSet<String>,
    /// Destroy after the first successful grant.
    pub self_destruct_on_view: bool,
    /// Destroy this many seconds after the first successful grant.
    pub self_destruct_after_secs: Option<u32>,
    /// Number of committed grants. Never decreases.
    pub view_count: u64,
    /// Append-only log of committed grants.
    pub viewer_log: Vec<ViewerEntry>,
    /// When the first grant was committed, if any.
    #[serde(with = "time::serde::rfc3339::option")]
    pub first_viewed_at: Option<OffsetDateTime>,
    /// Absolute instant the deferred destruction becomes effective.
    /// Armed by the first grant when `self_destruct_after_secs` is set.
    #[serde(with = "time::serde::rfc3339::option")]
    pub destruct_due_at: Option<OffsetDateTime>,
}

impl ShareRecord {
    /// Check whether the record's expiry deadline has passed.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    /// Check whether a deferred destruction deadline is armed and due.
    pub fn is_destruct_due(&self, now: OffsetDateTime) -> bool {
        self.destruct_due_at.is_some_and(|due| now >= due)
    }

    /// Check whether a one-time link has already been granted once.
    pub fn is_consumed(&self) -> bool {
        self.self_destruct_on_view && self.view_count > 0
    }

    /// Check whether the requester passes the allow-list.
    ///
    /// Allowed iff the allow-list is empty, the requester is the owner,
    /// or the requester is a (case-folded) member of the allow-list.
    pub fn allows(&self, requester: &Identity) -> bool {
        if self.allow_list.is_empty() {
            return true;
        }
        if let Identity::Known(id) = requester {
            if normalize_identity(id) == self.owner_id {
                return true;
            }
        }
        self.allow_list
            .iter()
            .any(|member| requester.matches(member))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn sample_record(allow: &[&str]) -> ShareRecord {
        let now = OffsetDateTime::now_utc();
        ShareRecord {
            id: ShareId::new(),
            owner_id: "owner-1".to_string(),
            content_ref: "blobs/owner-1/abc".to_string(),
            file_name: "photo.png".to_string(),
            file_kind: FileKind::Image,
            created_at: now,
            expires_at: now + Duration::hours(1),
            allow_list: allow.iter().map(|s| normalize_identity(s)).collect(),
            self_destruct_on_view: false,
            self_destruct_after_secs: None,
            view_count: 0,
            viewer_log: Vec::new(),
            first_viewed_at: None,
            destruct_due_at: None,
        }
    }

    #[test]
    fn test_share_id_roundtrip() {
        let id = ShareId::new();
        let parsed = ShareId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert!(ShareId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn test_file_kind_from_mime() {
        assert_eq!(FileKind::from_mime("image/png"), FileKind::Image);
        assert_eq!(FileKind::from_mime("video/mp4"), FileKind::Video);
        assert_eq!(FileKind::from_mime("application/pdf"), FileKind::Document);
        assert_eq!(FileKind::from_mime("text/plain"), FileKind::Document);
    }

    #[test]
    fn test_file_kind_parse_matches_as_str() {
        for kind in [FileKind::Image, FileKind::Video, FileKind::Document] {
            assert_eq!(FileKind::parse(kind.as_str()).unwrap(), kind);
        }
        assert!(FileKind::parse("pdf").is_err());
    }

    #[test]
    fn test_identity_normalization() {
        let id = Identity::known("  Alice@Example.COM ");
        assert_eq!(id.viewer_label(), "alice@example.com");
        assert!(id.matches("alice@example.com"));
        assert!(!Identity::Anonymous.matches("alice@example.com"));
        assert_eq!(Identity::Anonymous.viewer_label(), ANONYMOUS_VIEWER);
    }

    #[test]
    fn test_empty_allow_list_admits_anyone() {
        let record = sample_record(&[]);
        assert!(record.allows(&Identity::Anonymous));
        assert!(record.allows(&Identity::known("stranger@x.com")));
    }

    #[test]
    fn test_allow_list_is_case_folded() {
        let record = sample_record(&["a@x.com"]);
        assert!(record.allows(&Identity::known("A@X.COM")));
        assert!(!record.allows(&Identity::known("b@x.com")));
        assert!(!record.allows(&Identity::Anonymous));
    }

    #[test]
    fn test_owner_bypasses_allow_list() {
        let record = sample_record(&["a@x.com"]);
        assert!(record.allows(&Identity::known("owner-1")));
    }

    #[test]
    fn test_destruct_due() {
        let now = OffsetDateTime::now_utc();
        let mut record = sample_record(&[]);
        assert!(!record.is_destruct_due(now));
        record.destruct_due_at = Some(now - Duration::seconds(1));
        assert!(record.is_destruct_due(now));
        record.destruct_due_at = Some(now + Duration::seconds(10));
        assert!(!record.is_destruct_due(now));
    }
}
