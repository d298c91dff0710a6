//! Metadata store trait and SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::models::{ShareRow, ViewerRow};
use crate::repos::{GrantAttempt, ShareRepo};
use async_trait::async_trait;
use ember_core::access::{Decision, evaluate};
use ember_core::share::{Identity, ShareId, ShareRecord, ViewerEntry};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;

/// How many lost compare-and-set races a grant attempt absorbs before
/// reporting a conflict. Each retry re-evaluates from the updated
/// record, so one-time links resolve to `AlreadyConsumed` on the first
/// lost race; only records under sustained concurrent viewing loop.
const GRANT_RETRY_LIMIT: usize = 8;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: ShareRepo + Send + Sync {
    /// Apply the embedded schema.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| MetadataError::Config(format!("create {}: {e}", parent.display())))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection avoids
            // persistent "database is locked" failures under concurrent grants.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    async fn viewer_rows(&self, id: ShareId) -> MetadataResult<Vec<ViewerRow>> {
        let rows = sqlx::query_as::<_, ViewerRow>(
            "SELECT * FROM share_viewers WHERE share_id = ? ORDER BY position",
        )
        .bind(*id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ShareRepo for SqliteStore {
    async fn create_share(&self, record: &ShareRecord) -> MetadataResult<()> {
        if self.get_share(record.id).await?.is_some() {
            return Err(MetadataError::AlreadyExists(format!(
                "share {} already exists",
                record.id
            )));
        }

        let row = ShareRow::from_record(record)?;
        sqlx::query(
            "INSERT INTO shares (share_id, owner_id, content_ref, file_name, file_kind, \
             created_at, expires_at, allow_list, self_destruct_on_view, \
             self_destruct_after_secs, view_count, first_viewed_at, destruct_due_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(row.share_id)
        .bind(&row.owner_id)
        .bind(&row.content_ref)
        .bind(&row.file_name)
        .bind(&row.file_kind)
        .bind(row.created_at)
        .bind(row.expires_at)
        .bind(&row.allow_list)
        .bind(row.self_destruct_on_view)
        .bind(row.self_destruct_after_secs)
        .bind(row.view_count)
        .bind(row.first_viewed_at)
        .bind(row.destruct_due_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_share(&self, id: ShareId) -> MetadataResult<Option<ShareRecord>> {
        let row = sqlx::query_as::<_, ShareRow>("SELECT * FROM shares WHERE share_id = ?")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let viewers = self.viewer_rows(id).await?;
                Ok(Some(row.into_record(viewers)?))
            }
            None => Ok(None),
        }
    }

    async fn list_shares_for_owner(&self, owner_id: &str) -> MetadataResult<Vec<ShareRecord>> {
        let rows = sqlx::query_as::<_, ShareRow>(
            "SELECT * FROM shares WHERE owner_id = ? ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let viewers = self.viewer_rows(row.share_id.into()).await?;
            records.push(row.into_record(viewers)?);
        }
        Ok(records)
    }

    async fn commit_grant(
        &self,
        id: ShareId,
        requester: &Identity,
        now: OffsetDateTime,
    ) -> MetadataResult<GrantAttempt> {
        for _ in 0..GRANT_RETRY_LIMIT {
            let Some(record) = self.get_share(id).await? else {
                return Ok(GrantAttempt::Denied(Decision::NotFound));
            };

            // Re-run the full decision against the current snapshot;
            // the compare-and-set below makes it atomic with the increment.
            let decision = evaluate(Some(&record), now, requester);
            if !decision.is_grantable() {
                return Ok(GrantAttempt::Denied(decision));
            }

            let first_viewed_at = record.first_viewed_at.unwrap_or(now);
            // The due time is armed by the first grant, not at upload time.
            let destruct_due_at = match (record.view_count, record.self_destruct_after_secs) {
                (0, Some(secs)) => Some(now + time::Duration::seconds(i64::from(secs))),
                _ => record.destruct_due_at,
            };

            let mut tx = self.pool.begin().await?;
            let updated = sqlx::query(
                "UPDATE shares SET view_count = view_count + 1, first_viewed_at = ?, \
                 destruct_due_at = ? WHERE share_id = ? AND view_count = ?",
            )
            .bind(first_viewed_at)
            .bind(destruct_due_at)
            .bind(*record.id.as_uuid())
            .bind(record.view_count as i64)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                // Lost the race: the view count moved underneath us.
                // Re-evaluate from the updated record; a one-time link
                // resolves to AlreadyConsumed on the next pass.
                tx.rollback().await?;
                tracing::debug!(share_id = %id, "grant lost a view-count race, retrying");
                continue;
            }

            sqlx::query(
                "INSERT INTO share_viewers (share_id, position, viewer, viewed_at) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(*record.id.as_uuid())
            .bind(record.view_count as i64)
            .bind(requester.viewer_label())
            .bind(now)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;

            // Assemble the committed state locally; a re-read could race
            // with a destruction trigger that already fired.
            let mut committed = record;
            committed.view_count += 1;
            committed.viewer_log.push(ViewerEntry {
                viewer: requester.viewer_label().to_string(),
                viewed_at: now,
            });
            committed.first_viewed_at = Some(first_viewed_at);
            committed.destruct_due_at = destruct_due_at;
            return Ok(GrantAttempt::Committed(committed));
        }

        Err(MetadataError::Conflict(format!(
            "grant for share {id} lost {GRANT_RETRY_LIMIT} consecutive races"
        )))
    }

    async fn delete_share(&self, id: ShareId) -> MetadataResult<bool> {
        // Viewer rows cascade with the share row.
        let result = sqlx::query("DELETE FROM shares WHERE share_id = ?")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

const SCHEMA_SQL: &str = r#"
-- Share records
CREATE TABLE IF NOT EXISTS shares (
    share_id BLOB PRIMARY KEY,
    owner_id TEXT NOT NULL,
    content_ref TEXT NOT NULL,
    file_name TEXT NOT NULL,
    file_kind TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    allow_list TEXT NOT NULL DEFAULT '[]',
    self_destruct_on_view INTEGER NOT NULL DEFAULT 0,
    self_destruct_after_secs INTEGER,
    view_count INTEGER NOT NULL DEFAULT 0,
    first_viewed_at TEXT,
    destruct_due_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_shares_owner ON shares(owner_id, created_at);

-- Append-only viewer log; position equals the view count the grant
-- was committed at.
CREATE TABLE IF NOT EXISTS share_viewers (
    share_id BLOB NOT NULL,
    position INTEGER NOT NULL,
    viewer TEXT NOT NULL,
    viewed_at TEXT NOT NULL,
    PRIMARY KEY (share_id, position),
    FOREIGN KEY (share_id) REFERENCES shares(share_id) ON DELETE CASCADE
);
"#;
