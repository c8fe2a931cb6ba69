//! Background jobs

pub mod ledger_sync;

use std::sync::Arc;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::error;

use crate::db::Database;
use crate::services::download_backend::DownloadBackend;

/// Register the periodic ledger sync with the scheduler
pub async fn register_jobs(
    scheduler: &JobScheduler,
    cron: &str,
    db: Database,
    backends: Vec<Arc<dyn DownloadBackend>>,
) -> Result<()> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let db = db.clone();
        let backends = backends.clone();
        Box::pin(async move {
            if let Err(err) = ledger_sync::sync_all(&db, &backends).await {
                error!(error = %err, "Ledger sync run failed");
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
