//! Trackarr backend - episode tracking and selective download engine
//!
//! The binary wires the persistent store and the periodic ledger sync.
//! Feed fetching, concrete download-backend clients and the admin surface
//! are separate deployments that call into this crate's services.

use std::sync::Arc;

use tokio_cron_scheduler::JobScheduler;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trackarr::config::Config;
use trackarr::db::Database;
use trackarr::jobs;
use trackarr::services::download_backend::DownloadBackend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trackarr=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Trackarr");

    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;
    tracing::info!("Database connected");

    // Backends are registered by the embedding deployment; the standalone
    // binary runs history-only syncs (season packs are skipped until a
    // backend can list their files).
    let backends: Vec<Arc<dyn DownloadBackend>> = Vec::new();

    if let Err(err) = jobs::ledger_sync::sync_all(&db, &backends).await {
        tracing::error!(error = %err, "Initial ledger sync failed");
    }

    let scheduler = JobScheduler::new().await?;
    jobs::register_jobs(&scheduler, &config.sync_cron, db, backends).await?;
    scheduler.start().await?;
    tracing::info!(cron = %config.sync_cron, "Ledger sync scheduled");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    Ok(())
}
