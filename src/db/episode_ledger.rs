//! Episode ledger repository
//!
//! The durable set of confirmed-owned `(subscription, season, episode)` facts.
//! The UNIQUE constraint on that key is the sole concurrency-safety mechanism:
//! concurrent writers racing on the same fact both succeed at the storage
//! layer and the loser's insert is a benign no-op.

use std::collections::BTreeMap;

use anyhow::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Episode ledger record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EpisodeLedgerRecord {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub season: i32,
    pub episode: i32,
    pub torrent_hash: Option<String>,
    pub torrent_title: String,
    /// Pre-record batch this fact belongs to, for rollback
    pub download_id: Option<Uuid>,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

/// Input for recording an owned episode
#[derive(Debug)]
pub struct RecordEpisode {
    pub subscription_id: Uuid,
    pub season: i32,
    pub episode: i32,
    pub torrent_hash: Option<String>,
    pub torrent_title: String,
    pub download_id: Option<Uuid>,
}

pub struct EpisodeLedgerRepository {
    pool: SqlitePool,
}

impl EpisodeLedgerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record an owned episode with insert-or-ignore semantics.
    ///
    /// Returns `false` when the `(subscription, season, episode)` key already
    /// existed. First writer wins; later writes never update in place.
    pub async fn record(&self, input: RecordEpisode) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO episode_ledger
                (id, subscription_id, season, episode, torrent_hash, torrent_title, download_id, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (subscription_id, season, episode) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.subscription_id)
        .bind(input.season)
        .bind(input.episode)
        .bind(&input.torrent_hash)
        .bind(&input.torrent_title)
        .bind(input.download_id)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Owned episodes for one season of a subscription, ascending
    pub async fn episodes_for_season(
        &self,
        subscription_id: Uuid,
        season: i32,
    ) -> Result<Vec<i32>> {
        let rows: Vec<(i32,)> = sqlx::query_as(
            r#"
            SELECT episode
            FROM episode_ledger
            WHERE subscription_id = ? AND season = ?
            ORDER BY episode
            "#,
        )
        .bind(subscription_id)
        .bind(season)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(e,)| e).collect())
    }

    /// Merged view of the ledger for a subscription, grouped by season
    pub async fn seasons_for_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<BTreeMap<i32, Vec<i32>>> {
        let rows: Vec<(i32, i32)> = sqlx::query_as(
            r#"
            SELECT season, episode
            FROM episode_ledger
            WHERE subscription_id = ?
            ORDER BY season, episode
            "#,
        )
        .bind(subscription_id)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: BTreeMap<i32, Vec<i32>> = BTreeMap::new();
        for (season, episode) in rows {
            grouped.entry(season).or_default().push(episode);
        }

        Ok(grouped)
    }

    /// Delete the ledger rows written by one pre-record batch (rollback)
    pub async fn delete_by_download(&self, download_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM episode_ledger WHERE download_id = ?")
            .bind(download_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Total ledger rows for a subscription
    pub async fn count_for_subscription(&self, subscription_id: Uuid) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM episode_ledger WHERE subscription_id = ?")
                .bind(subscription_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}
