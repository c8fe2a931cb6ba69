//! Application configuration management

use std::env;

use anyhow::Result;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Database URL (SQLite) - a bare path is accepted and prefixed
    pub database_url: String,

    /// Default save path handed to download backends
    pub save_path: Option<String>,

    /// Default category handed to download backends
    pub category: Option<String>,

    /// Cron expression for the periodic ledger sync
    pub sync_cron: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Prefer DATABASE_PATH, fall back to DATABASE_URL
        let raw = env::var("DATABASE_PATH")
            .or_else(|_| env::var("DATABASE_URL"))
            .unwrap_or_else(|_| "./data/trackarr.db".to_string());

        let database_url = if raw.starts_with("sqlite:") {
            raw
        } else {
            format!("sqlite://{}", raw)
        };

        Ok(Self {
            database_url,
            save_path: env::var("DOWNLOAD_SAVE_PATH").ok(),
            category: env::var("DOWNLOAD_CATEGORY").ok(),
            sync_cron: env::var("LEDGER_SYNC_CRON")
                .unwrap_or_else(|_| "0 0 */4 * * *".to_string()),
        })
    }
}
