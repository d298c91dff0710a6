//! Database models mapping to the share metadata schema.

use crate::error::{MetadataError, MetadataResult};
use ember_core::share::{FileKind, ShareRecord, ViewerEntry};
use sqlx::FromRow;
use std::collections::BTreeSet;
use time::OffsetDateTime;
use uuid::Uuid;

/// Share record row.
#[derive(Debug, Clone, FromRow)]
pub struct ShareRow {
    pub share_id: Uuid,
    pub owner_id: String,
    pub content_ref: String,
    pub file_name: String,
    pub file_kind: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    /// JSON array of normalized recipient identities.
    pub allow_list: String,
    pub self_destruct_on_view: bool,
    pub self_destruct_after_secs: Option<i64>,
    pub view_count: i64,
    pub first_viewed_at: Option<OffsetDateTime>,
    pub destruct_due_at: Option<OffsetDateTime>,
}

/// Viewer log row. Append-only; `position` equals the view count the
/// grant was committed at.
#[derive(Debug, Clone, FromRow)]
pub struct ViewerRow {
    pub share_id: Uuid,
    pub position: i64,
    pub viewer: String,
    pub viewed_at: OffsetDateTime,
}

impl ShareRow {
    /// Build a row from a domain record (viewer log is stored separately).
    pub fn from_record(record: &ShareRecord) -> MetadataResult<Self> {
        let allow_list: Vec<&String> = record.allow_list.iter().collect();
        Ok(Self {
            share_id: *record.id.as_uuid(),
            owner_id: record.owner_id.clone(),
            content_ref: record.content_ref.clone(),
            file_name: record.file_name.clone(),
            file_kind: record.file_kind.as_str().to_string(),
            created_at: record.created_at,
            expires_at: record.expires_at,
            allow_list: serde_json::to_string(&allow_list)
                .map_err(|e| MetadataError::Internal(format!("allow_list encode: {e}")))?,
            self_destruct_on_view: record.self_destruct_on_view,
            self_destruct_after_secs: record.self_destruct_after_secs.map(i64::from),
            view_count: record.view_count as i64,
            first_viewed_at: record.first_viewed_at,
            destruct_due_at: record.destruct_due_at,
        })
    }

    /// Convert a row plus its viewer log back into a domain record.
    pub fn into_record(self, viewers: Vec<ViewerRow>) -> MetadataResult<ShareRecord> {
        let allow_list: BTreeSet<String> = serde_json::from_str(&self.allow_list)
            .map_err(|e| MetadataError::Internal(format!("allow_list decode: {e}")))?;
        let file_kind = FileKind::parse(&self.file_kind)
            .map_err(|e| MetadataError::Internal(e.to_string()))?;
        let viewer_log = viewers
            .into_iter()
            .map(|row| ViewerEntry {
                viewer: row.viewer,
                viewed_at: row.viewed_at,
            })
            .collect();
        Ok(ShareRecord {
            id: self.share_id.into(),
            owner_id: self.owner_id,
            content_ref: self.content_ref,
            file_name: self.file_name,
            file_kind,
            created_at: self.created_at,
            expires_at: self.expires_at,
            allow_list,
            self_destruct_on_view: self.self_destruct_on_view,
            self_destruct_after_secs: self
                .self_destruct_after_secs
                .map(|secs| secs.clamp(0, u32::MAX as i64) as u32),
            view_count: self.view_count.max(0) as u64,
            viewer_log,
            first_viewed_at: self.first_viewed_at,
            destruct_due_at: self.destruct_due_at,
        })
    }
}
