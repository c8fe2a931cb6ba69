//! Download history repository
//!
//! One row per acquired release. Rows are written as `pending` at pre-record
//! time, flipped to `finished` by the download monitor, and deleted when a
//! backend submission is rolled back.

use anyhow::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Statuses a history row moves through
pub const STATUS_PENDING: &str = "pending";
pub const STATUS_FINISHED: &str = "finished";

/// Download history record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DownloadHistoryRecord {
    pub id: Uuid,
    /// Retrieval task that wrote this row; NULL for manual downloads
    pub task_id: Option<Uuid>,
    pub title: String,
    pub url: Option<String>,
    pub torrent_hash: Option<String>,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Input for creating a history row
#[derive(Debug)]
pub struct CreateDownloadHistory {
    pub id: Uuid,
    pub task_id: Option<Uuid>,
    pub title: String,
    pub url: Option<String>,
    pub torrent_hash: Option<String>,
    pub status: String,
}

pub struct DownloadHistoryRepository {
    pool: SqlitePool,
}

impl DownloadHistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a history row (used for pre-recording before backend submission)
    pub async fn create(&self, input: CreateDownloadHistory) -> Result<DownloadHistoryRecord> {
        let now = chrono::Utc::now();

        sqlx::query(
            r#"
            INSERT INTO download_history (id, task_id, title, url, torrent_hash, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(input.id)
        .bind(input.task_id)
        .bind(&input.title)
        .bind(&input.url)
        .bind(&input.torrent_hash)
        .bind(&input.status)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(DownloadHistoryRecord {
            id: input.id,
            task_id: input.task_id,
            title: input.title,
            url: input.url,
            torrent_hash: input.torrent_hash,
            status: input.status,
            created_at: now,
        })
    }

    /// Get a history row by ID
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<DownloadHistoryRecord>> {
        let record = sqlx::query_as::<_, DownloadHistoryRecord>(
            r#"
            SELECT id, task_id, title, url, torrent_hash, status, created_at
            FROM download_history
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Delete a history row (rollback of a failed submission)
    pub async fn delete(&self, id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM download_history WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Mark a history row as finished
    pub async fn mark_finished(&self, id: Uuid) -> Result<u64> {
        let result = sqlx::query("UPDATE download_history SET status = ? WHERE id = ?")
            .bind(STATUS_FINISHED)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// All rows for one task, regardless of status.
    ///
    /// Pending pre-records are included deliberately: an in-flight download
    /// must block a concurrent duplicate for the same task.
    pub async fn list_for_task(&self, task_id: Uuid) -> Result<Vec<DownloadHistoryRecord>> {
        let records = sqlx::query_as::<_, DownloadHistoryRecord>(
            r#"
            SELECT id, task_id, title, url, torrent_hash, status, created_at
            FROM download_history
            WHERE task_id = ?
            ORDER BY created_at
            "#,
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// All finished rows
    pub async fn list_finished(&self) -> Result<Vec<DownloadHistoryRecord>> {
        let records = sqlx::query_as::<_, DownloadHistoryRecord>(
            r#"
            SELECT id, task_id, title, url, torrent_hash, status, created_at
            FROM download_history
            WHERE status = ?
            ORDER BY created_at
            "#,
        )
        .bind(STATUS_FINISHED)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Finished rows written by other tasks (or by no task at all)
    pub async fn list_finished_other_tasks(
        &self,
        task_id: Option<Uuid>,
    ) -> Result<Vec<DownloadHistoryRecord>> {
        let records = match task_id {
            Some(task_id) => {
                sqlx::query_as::<_, DownloadHistoryRecord>(
                    r#"
                    SELECT id, task_id, title, url, torrent_hash, status, created_at
                    FROM download_history
                    WHERE status = ? AND (task_id IS NULL OR task_id != ?)
                    ORDER BY created_at
                    "#,
                )
                .bind(STATUS_FINISHED)
                .bind(task_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => self.list_finished().await?,
        };

        Ok(records)
    }
}
