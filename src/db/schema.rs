//! Idempotent schema migration
//!
//! Converges the database to the expected schema at startup. Tables are
//! created only if missing; no column renames or type changes are handled.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::debug;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS subscriptions (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        alias TEXT,
        season INTEGER,
        total_episodes INTEGER,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS download_history (
        id TEXT PRIMARY KEY,
        task_id TEXT,
        title TEXT NOT NULL,
        url TEXT,
        torrent_hash TEXT,
        status TEXT NOT NULL DEFAULT 'pending',
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS episode_ledger (
        id TEXT PRIMARY KEY,
        subscription_id TEXT NOT NULL,
        season INTEGER NOT NULL,
        episode INTEGER NOT NULL,
        torrent_hash TEXT,
        torrent_title TEXT NOT NULL,
        download_id TEXT,
        recorded_at TEXT NOT NULL,
        UNIQUE (subscription_id, season, episode)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_download_history_task ON download_history (task_id)",
    "CREATE INDEX IF NOT EXISTS idx_download_history_status ON download_history (status)",
    "CREATE INDEX IF NOT EXISTS idx_episode_ledger_season ON episode_ledger (subscription_id, season)",
    "CREATE INDEX IF NOT EXISTS idx_episode_ledger_download ON episode_ledger (download_id)",
];

/// Create missing tables and indexes
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }

    debug!("Schema migration complete");
    Ok(())
}
