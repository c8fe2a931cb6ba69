//! Subscription repository
//!
//! Subscriptions are owned by the administrative layer; this core only reads
//! them for the fallback season and the fuzzy-match name/alias.

use anyhow::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Subscription record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubscriptionRecord {
    pub id: Uuid,
    pub name: String,
    pub alias: Option<String>,
    /// Configured default season, used when a title omits one
    pub season: Option<i32>,
    pub total_episodes: Option<i32>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Input for creating a subscription
#[derive(Debug)]
pub struct CreateSubscription {
    pub name: String,
    pub alias: Option<String>,
    pub season: Option<i32>,
    pub total_episodes: Option<i32>,
}

pub struct SubscriptionRepository {
    pool: SqlitePool,
}

impl SubscriptionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a subscription by ID
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<SubscriptionRecord>> {
        let record = sqlx::query_as::<_, SubscriptionRecord>(
            r#"
            SELECT id, name, alias, season, total_episodes, created_at
            FROM subscriptions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// List all subscriptions
    pub async fn list(&self) -> Result<Vec<SubscriptionRecord>> {
        let records = sqlx::query_as::<_, SubscriptionRecord>(
            r#"
            SELECT id, name, alias, season, total_episodes, created_at
            FROM subscriptions
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Create a new subscription
    pub async fn create(&self, input: CreateSubscription) -> Result<SubscriptionRecord> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        sqlx::query(
            r#"
            INSERT INTO subscriptions (id, name, alias, season, total_episodes, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.alias)
        .bind(input.season)
        .bind(input.total_episodes)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(SubscriptionRecord {
            id,
            name: input.name,
            alias: input.alias,
            season: input.season,
            total_episodes: input.total_episodes,
            created_at: now,
        })
    }
}
