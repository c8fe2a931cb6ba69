//! Database connection and repositories

pub mod download_history;
pub mod episode_ledger;
pub mod schema;
pub mod subscriptions;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

pub use download_history::{CreateDownloadHistory, DownloadHistoryRecord, DownloadHistoryRepository};
pub use episode_ledger::{EpisodeLedgerRecord, EpisodeLedgerRepository, RecordEpisode};
pub use subscriptions::{CreateSubscription, SubscriptionRecord, SubscriptionRepository};

/// Database wrapper providing connection pool access
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database wrapper from an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the maximum connection pool size from environment or default
    fn get_max_connections() -> u32 {
        std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10)
    }

    /// Create a new database connection pool
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // Every pooled connection to :memory: gets its own empty database, so
        // in-memory databases must stay on a single connection.
        let max_connections = if url.contains(":memory:") {
            1
        } else {
            Self::get_max_connections()
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Run the idempotent schema migration
    pub async fn migrate(&self) -> Result<()> {
        schema::migrate(&self.pool).await
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Subscription repository (read-mostly)
    pub fn subscriptions(&self) -> SubscriptionRepository {
        SubscriptionRepository::new(self.pool.clone())
    }

    /// Download history repository
    pub fn history(&self) -> DownloadHistoryRepository {
        DownloadHistoryRepository::new(self.pool.clone())
    }

    /// Episode ledger repository
    pub fn ledger(&self) -> EpisodeLedgerRepository {
        EpisodeLedgerRepository::new(self.pool.clone())
    }
}
