//! Download coordination: pre-record, submit, rollback
//!
//! The submission to the external backend cannot participate in a local
//! transaction, so the sequence is an explicit saga: a provisional history
//! row (and ledger facts for concrete episodes) is written first, the
//! backend is invoked, and on any failure the provisional rows are deleted
//! by compensating deletes keyed on the pre-record id. Every call either
//! fully commits or fully rolls back; retries belong to the scheduler that
//! invoked the check, never to this module.

use anyhow::{Context, Result};
use base64::Engine;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::download_history::STATUS_PENDING;
use crate::db::{CreateDownloadHistory, Database, RecordEpisode, SubscriptionRecord};
use crate::services::download_backend::{DownloadBackend, SubmitOptions};
use crate::services::episode_parser::EpisodeId;
use crate::services::existence::CandidateItem;

/// Final result of a coordinated download attempt
#[derive(Debug, Clone, Serialize)]
pub struct DownloadOutcome {
    pub success: bool,
    pub message: String,
}

/// Everything the coordinator needs for one submission
#[derive(Debug)]
pub struct DownloadRequest<'a> {
    pub candidate: &'a CandidateItem,
    pub subscription: &'a SubscriptionRecord,
    /// Raw torrent data, base64. When absent the candidate link is submitted
    /// instead and file selection is unavailable.
    pub payload_base64: Option<&'a str>,
    pub save_path: Option<&'a str>,
    pub category: Option<&'a str>,
    /// Selected file indices for season packs
    pub file_indices: Option<&'a [usize]>,
    /// Batch id written by [`pre_record`]
    pub pre_record_id: Uuid,
}

/// Write the provisional history row and, for releases with concrete
/// episodes, the ledger facts - all tagged with one batch id so a failed
/// submission can be rolled back as a unit.
///
/// Must be called before [`execute_download`]; the provisional rows are what
/// stop a concurrent redundancy check from re-selecting the same episodes.
pub async fn pre_record(
    db: &Database,
    candidate: &CandidateItem,
    subscription: &SubscriptionRecord,
    task_id: Option<Uuid>,
    torrent_hash: Option<&str>,
    parsed: Option<&EpisodeId>,
    target_season: i32,
) -> Result<Uuid> {
    let pre_record_id = Uuid::new_v4();

    db.history()
        .create(CreateDownloadHistory {
            id: pre_record_id,
            task_id,
            title: candidate.title.clone(),
            url: Some(candidate.link.clone()),
            torrent_hash: torrent_hash.map(str::to_string),
            status: STATUS_PENDING.to_string(),
        })
        .await
        .context("failed to pre-record history row")?;

    if let Some(parsed) = parsed {
        for &episode in &parsed.episodes {
            // Losing the uniqueness race here is fine; the episode is owned
            // either way.
            db.ledger()
                .record(RecordEpisode {
                    subscription_id: subscription.id,
                    season: target_season,
                    episode,
                    torrent_hash: torrent_hash.map(str::to_string),
                    torrent_title: candidate.title.clone(),
                    download_id: Some(pre_record_id),
                })
                .await?;
        }
    }

    Ok(pre_record_id)
}

/// Submit a pre-recorded download to the backend, rolling back on failure.
///
/// An `Err` from the backend (transport error, timeout) takes the same path
/// as an explicit `success: false` response.
pub async fn execute_download(
    db: &Database,
    backend: &dyn DownloadBackend,
    request: DownloadRequest<'_>,
) -> Result<DownloadOutcome> {
    let options = SubmitOptions {
        save_path: request.save_path.map(str::to_string),
        category: request.category.map(str::to_string),
        file_indices: request.file_indices.map(<[usize]>::to_vec),
    };

    let submitted = match request.payload_base64 {
        Some(payload) => {
            // Reject a corrupt payload before it reaches the backend; the
            // pre-recorded rows still have to go.
            if let Err(err) = base64::engine::general_purpose::STANDARD.decode(payload) {
                let message = format!("invalid torrent payload: {err}");
                rollback(db, request.pre_record_id, &message).await?;
                return Ok(DownloadOutcome {
                    success: false,
                    message,
                });
            }
            backend.submit_data(payload, &options).await
        }
        None => {
            let options = SubmitOptions {
                file_indices: None,
                ..options
            };
            backend.submit_url(&request.candidate.link, &options).await
        }
    };

    match submitted {
        Ok(outcome) if outcome.success => {
            info!(
                backend = backend.name(),
                subscription = %request.subscription.name,
                title = %request.candidate.title,
                "Submitted download"
            );
            Ok(DownloadOutcome {
                success: true,
                message: String::new(),
            })
        }
        Ok(outcome) => {
            rollback(db, request.pre_record_id, &outcome.message).await?;
            Ok(DownloadOutcome {
                success: false,
                message: outcome.message,
            })
        }
        Err(err) => {
            let message = err.to_string();
            rollback(db, request.pre_record_id, &message).await?;
            Ok(DownloadOutcome {
                success: false,
                message,
            })
        }
    }
}

/// Compensating deletes for one pre-record batch
async fn rollback(db: &Database, pre_record_id: Uuid, reason: &str) -> Result<()> {
    warn!(
        pre_record_id = %pre_record_id,
        reason,
        "Backend submission failed, rolling back pre-recorded rows"
    );

    db.history()
        .delete(pre_record_id)
        .await
        .context("failed to roll back history row")?;
    db.ledger()
        .delete_by_download(pre_record_id)
        .await
        .context("failed to roll back ledger rows")?;

    Ok(())
}
