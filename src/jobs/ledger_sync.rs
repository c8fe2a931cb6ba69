//! Ledger synchronizer
//!
//! Batch reconciliation that rebuilds the episode ledger from finished
//! download history and, for season packs, from live torrent file listings.
//! The job is the system's self-healing path: every insert is idempotent, so
//! it can be re-run at any time and converges to the same result no matter
//! how much of the work previous runs already completed.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::{Database, RecordEpisode};
use crate::services::download_backend::{DownloadBackend, RemoteFile};
use crate::services::episode_parser::parse_episode_id;
use crate::services::text_match::title_matches_subscription;

/// A `(season, episode)` fact queued for insertion
struct LedgerFact {
    season: i32,
    episode: i32,
    torrent_hash: Option<String>,
    torrent_title: String,
}

/// Rebuild the ledger for one subscription and return the merged view
/// grouped by season.
pub async fn sync_subscription(
    db: &Database,
    backends: &[Arc<dyn DownloadBackend>],
    subscription_id: Uuid,
) -> Result<BTreeMap<i32, Vec<i32>>> {
    let subscription = db
        .subscriptions()
        .get_by_id(subscription_id)
        .await?
        .context("subscription not found")?;

    let finished = db.history().list_finished().await?;

    let mut facts: Vec<LedgerFact> = Vec::new();
    // Season packs need file-level inspection: (season, torrent_hash, title)
    let mut packs: Vec<(i32, String, String)> = Vec::new();

    for record in finished.iter().filter(|record| {
        title_matches_subscription(
            &record.title,
            &subscription.name,
            subscription.alias.as_deref(),
        )
    }) {
        let Some(parsed) = parse_episode_id(&record.title) else {
            continue;
        };

        if !parsed.episodes.is_empty() {
            let season = parsed.season.or(subscription.season).unwrap_or(1);
            for &episode in &parsed.episodes {
                facts.push(LedgerFact {
                    season,
                    episode,
                    torrent_hash: record.torrent_hash.clone(),
                    torrent_title: record.title.clone(),
                });
            }
        } else if let Some(season) = parsed.season {
            match &record.torrent_hash {
                Some(hash) => packs.push((season, hash.clone(), record.title.clone())),
                None => debug!(
                    title = %record.title,
                    "Season pack has no torrent hash, cannot inspect files"
                ),
            }
        }
    }

    for (pack_season, hash, title) in packs {
        let Some(files) = list_files_any_backend(backends, &hash).await else {
            // Unlistable this pass; stays eligible for a future sync
            warn!(
                subscription = %subscription.name,
                torrent_hash = %hash,
                "No backend could list season pack files, skipping"
            );
            continue;
        };

        for file in &files {
            let Some(parsed) = parse_episode_id(&file.name) else {
                continue;
            };
            let season = parsed.season.unwrap_or(pack_season);
            for &episode in &parsed.episodes {
                facts.push(LedgerFact {
                    season,
                    episode,
                    torrent_hash: Some(hash.clone()),
                    torrent_title: title.clone(),
                });
            }
        }
    }

    let mut inserted = 0usize;
    for fact in facts {
        let new = db
            .ledger()
            .record(RecordEpisode {
                subscription_id,
                season: fact.season,
                episode: fact.episode,
                torrent_hash: fact.torrent_hash,
                torrent_title: fact.torrent_title,
                download_id: None,
            })
            .await?;
        if new {
            inserted += 1;
        }
    }

    info!(
        subscription = %subscription.name,
        inserted,
        "Ledger sync complete"
    );

    db.ledger().seasons_for_subscription(subscription_id).await
}

/// Run the sync for every subscription; one failing subscription does not
/// abort the others.
pub async fn sync_all(db: &Database, backends: &[Arc<dyn DownloadBackend>]) -> Result<()> {
    for subscription in db.subscriptions().list().await? {
        if let Err(err) = sync_subscription(db, backends, subscription.id).await {
            warn!(
                subscription = %subscription.name,
                error = %err,
                "Ledger sync failed for subscription"
            );
        }
    }

    Ok(())
}

/// Ask each configured backend for the torrent's file list; first success
/// wins.
async fn list_files_any_backend(
    backends: &[Arc<dyn DownloadBackend>],
    torrent_hash: &str,
) -> Option<Vec<RemoteFile>> {
    for backend in backends {
        match backend.list_files(torrent_hash).await {
            Ok(files) => return Some(files),
            Err(err) => debug!(
                backend = backend.name(),
                torrent_hash,
                error = %err,
                "Backend could not list torrent files"
            ),
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::download_history::{STATUS_FINISHED, STATUS_PENDING};
    use crate::db::{CreateDownloadHistory, CreateSubscription};
    use crate::services::download_backend::{BackendError, SubmitOptions, SubmitOutcome};
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Backend double that knows file lists for a fixed set of hashes
    struct ListingBackend {
        listings: HashMap<String, Vec<RemoteFile>>,
    }

    #[async_trait]
    impl DownloadBackend for ListingBackend {
        fn name(&self) -> &str {
            "listing"
        }

        async fn submit_url(
            &self,
            _url: &str,
            _options: &SubmitOptions,
        ) -> Result<SubmitOutcome, BackendError> {
            Ok(SubmitOutcome::ok())
        }

        async fn submit_data(
            &self,
            _payload_base64: &str,
            _options: &SubmitOptions,
        ) -> Result<SubmitOutcome, BackendError> {
            Ok(SubmitOutcome::ok())
        }

        async fn list_files(&self, torrent_hash: &str) -> Result<Vec<RemoteFile>, BackendError> {
            self.listings
                .get(torrent_hash)
                .cloned()
                .ok_or_else(|| BackendError::NotFound(torrent_hash.to_string()))
        }
    }

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    async fn add_history(db: &Database, title: &str, hash: Option<&str>, status: &str) {
        db.history()
            .create(CreateDownloadHistory {
                id: Uuid::new_v4(),
                task_id: None,
                title: title.to_string(),
                url: None,
                torrent_hash: hash.map(str::to_string),
                status: status.to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sync_backfills_from_history() {
        let db = test_db().await;
        let sub = db
            .subscriptions()
            .create(CreateSubscription {
                name: "Show".to_string(),
                alias: None,
                season: Some(1),
                total_episodes: None,
            })
            .await
            .unwrap();

        add_history(&db, "Show.S01E01.1080p", None, STATUS_FINISHED).await;
        add_history(&db, "Show.S01E02-E03.1080p", None, STATUS_FINISHED).await;
        // Pending rows are not history yet
        add_history(&db, "Show.S01E09.1080p", None, STATUS_PENDING).await;
        // Other shows do not leak in
        add_history(&db, "Unrelated.S01E04.1080p", None, STATUS_FINISHED).await;

        let merged = sync_subscription(&db, &[], sub.id).await.unwrap();
        assert_eq!(merged.get(&1), Some(&vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_sync_inspects_season_pack_files() {
        let db = test_db().await;
        let sub = db
            .subscriptions()
            .create(CreateSubscription {
                name: "Show".to_string(),
                alias: None,
                season: Some(1),
                total_episodes: None,
            })
            .await
            .unwrap();

        add_history(&db, "Show.S02.Complete.2160p", Some("abc123"), STATUS_FINISHED).await;

        let backend: Arc<dyn DownloadBackend> = Arc::new(ListingBackend {
            listings: [(
                "abc123".to_string(),
                vec![
                    RemoteFile {
                        name: "Show.S02E01.mkv".to_string(),
                        size: 1,
                    },
                    RemoteFile {
                        name: "Show.S02E02.mkv".to_string(),
                        size: 1,
                    },
                    RemoteFile {
                        name: "Show.S02.nfo".to_string(),
                        size: 1,
                    },
                ],
            )]
            .into_iter()
            .collect(),
        });

        let merged = sync_subscription(&db, &[backend], sub.id).await.unwrap();
        assert_eq!(merged.get(&2), Some(&vec![1, 2]));
    }

    #[tokio::test]
    async fn test_unlistable_pack_is_skipped_not_fatal() {
        let db = test_db().await;
        let sub = db
            .subscriptions()
            .create(CreateSubscription {
                name: "Show".to_string(),
                alias: None,
                season: Some(1),
                total_episodes: None,
            })
            .await
            .unwrap();

        add_history(&db, "Show.S03.Complete.1080p", Some("deadbeef"), STATUS_FINISHED).await;
        add_history(&db, "Show.S01E01.1080p", None, STATUS_FINISHED).await;

        let backend: Arc<dyn DownloadBackend> = Arc::new(ListingBackend {
            listings: HashMap::new(),
        });

        let merged = sync_subscription(&db, &[backend], sub.id).await.unwrap();
        assert_eq!(merged.get(&1), Some(&vec![1]));
        assert!(merged.get(&3).is_none());
    }

    #[tokio::test]
    async fn test_sync_is_idempotent() {
        let db = test_db().await;
        let sub = db
            .subscriptions()
            .create(CreateSubscription {
                name: "Show".to_string(),
                alias: None,
                season: Some(1),
                total_episodes: None,
            })
            .await
            .unwrap();

        add_history(&db, "Show.S01E01.1080p", None, STATUS_FINISHED).await;

        let first = sync_subscription(&db, &[], sub.id).await.unwrap();
        let second = sync_subscription(&db, &[], sub.id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(db.ledger().count_for_subscription(sub.id).await.unwrap(), 1);
    }
}
