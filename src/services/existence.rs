//! Redundancy checking for discovered releases
//!
//! Merges three independently-updated sources of truth to decide whether a
//! candidate's episodes are already owned:
//! 1. the episode ledger (authoritative and cheapest),
//! 2. this task's own history (catches rows the ledger has not backfilled,
//!    including pending pre-records),
//! 3. finished history from other tasks, matched to the subscription by
//!    fuzzy title comparison (catches the same series acquired manually or
//!    through a different feed).
//!
//! The pure merge/decision logic is separate from the database orchestration
//! so it can be exercised without a store.

use std::collections::HashSet;

use anyhow::{Context, Result};
use serde::Serialize;
use uuid::Uuid;

use crate::db::{Database, SubscriptionRecord};
use crate::services::episode_parser::{parse_episode_id, EpisodeId};
use crate::services::text_match::title_matches_subscription;

/// A release discovered by the feed collaborator
#[derive(Debug, Clone, Serialize)]
pub struct CandidateItem {
    pub title: String,
    pub link: String,
    pub guid: String,
    pub size: i64,
}

/// Outcome of a redundancy check
#[derive(Debug, Clone, Serialize)]
pub struct RedundancyDecision {
    pub is_redundant: bool,
    /// Episodes already owned for the target season; for season packs this
    /// feeds file selection downstream
    pub downloaded_episodes: HashSet<i32>,
}

/// Resolve the season a candidate is about: parsed season, then the
/// subscription's configured season, then 1.
pub fn resolve_target_season(
    parsed: Option<&EpisodeId>,
    subscription: &SubscriptionRecord,
) -> i32 {
    parsed
        .and_then(|id| id.season)
        .or(subscription.season)
        .unwrap_or(1)
}

/// Union the three owned-episode sources for one target season.
///
/// A historical title whose parsed season is absent counts toward any target
/// season. That over-matches pre-tagging-era records on purpose; see the
/// module docs in `episode_parser` for why titles may omit the season.
pub fn merge_owned_episodes(
    subscription: &SubscriptionRecord,
    target_season: i32,
    ledger_episodes: &[i32],
    task_history: &[String],
    other_history: &[String],
) -> HashSet<i32> {
    let mut owned: HashSet<i32> = ledger_episodes.iter().copied().collect();

    let mut absorb = |title: &String| {
        if let Some(parsed) = parse_episode_id(title) {
            if parsed.season.is_none() || parsed.season == Some(target_season) {
                owned.extend(parsed.episodes.iter().copied());
            }
        }
    };

    for title in task_history {
        absorb(title);
    }

    for title in other_history {
        if title_matches_subscription(title, &subscription.name, subscription.alias.as_deref()) {
            absorb(title);
        }
    }

    owned
}

/// Decide redundancy from a parsed candidate and the merged owned set.
///
/// Unparseable candidates and season packs are never redundant here; they
/// proceed to download-time handling where file selection narrows them.
pub fn evaluate_candidate(
    parsed: Option<&EpisodeId>,
    owned: HashSet<i32>,
) -> RedundancyDecision {
    let is_redundant = match parsed {
        Some(id) if !id.episodes.is_empty() => {
            id.episodes.iter().all(|episode| owned.contains(episode))
        }
        _ => false,
    };

    RedundancyDecision {
        is_redundant,
        downloaded_episodes: owned,
    }
}

/// Full redundancy check against the persistent store.
///
/// Point-in-time read: two concurrent checks for the same missing episode can
/// both come back non-redundant. The ledger's uniqueness constraint resolves
/// that race after the fact.
pub async fn check_redundancy(
    db: &Database,
    candidate: &CandidateItem,
    subscription: &SubscriptionRecord,
    task_id: Option<Uuid>,
) -> Result<RedundancyDecision> {
    let parsed = parse_episode_id(&candidate.title);
    let target_season = resolve_target_season(parsed.as_ref(), subscription);

    let ledger_episodes = db
        .ledger()
        .episodes_for_season(subscription.id, target_season)
        .await
        .context("failed to query episode ledger")?;

    let task_history: Vec<String> = match task_id {
        Some(task_id) => db
            .history()
            .list_for_task(task_id)
            .await?
            .into_iter()
            .map(|record| record.title)
            .collect(),
        None => Vec::new(),
    };

    let other_history: Vec<String> = db
        .history()
        .list_finished_other_tasks(task_id)
        .await?
        .into_iter()
        .map(|record| record.title)
        .collect();

    let owned = merge_owned_episodes(
        subscription,
        target_season,
        &ledger_episodes,
        &task_history,
        &other_history,
    );

    Ok(evaluate_candidate(parsed.as_ref(), owned))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription(name: &str, season: Option<i32>) -> SubscriptionRecord {
        SubscriptionRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            alias: None,
            season,
            total_episodes: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_all_episodes_owned_is_redundant() {
        let sub = subscription("Show", Some(1));
        let owned = merge_owned_episodes(&sub, 1, &[1, 2, 3, 4, 5], &[], &[]);
        let parsed = parse_episode_id("Show.S01E03-E04.1080p");
        let decision = evaluate_candidate(parsed.as_ref(), owned);
        assert!(decision.is_redundant);
    }

    #[test]
    fn test_partially_new_is_not_redundant() {
        let sub = subscription("Show", Some(1));
        let owned = merge_owned_episodes(&sub, 1, &[1, 2, 3, 4, 5], &[], &[]);
        let parsed = parse_episode_id("Show.S01E05-E06.1080p");
        let decision = evaluate_candidate(parsed.as_ref(), owned);
        assert!(!decision.is_redundant);
    }

    #[test]
    fn test_season_pack_never_redundant_here() {
        let sub = subscription("Show", Some(1));
        let owned = merge_owned_episodes(&sub, 1, &[1, 2, 3], &[], &[]);
        let parsed = parse_episode_id("Show.S01.Complete");
        let decision = evaluate_candidate(parsed.as_ref(), owned);
        assert!(!decision.is_redundant);
        assert_eq!(decision.downloaded_episodes.len(), 3);
    }

    #[test]
    fn test_unparseable_never_redundant() {
        let decision = evaluate_candidate(None, HashSet::new());
        assert!(!decision.is_redundant);
    }

    #[test]
    fn test_task_history_counts() {
        let sub = subscription("Show", Some(2));
        let history = vec!["Show.S02E07.720p".to_string()];
        let owned = merge_owned_episodes(&sub, 2, &[], &history, &[]);
        assert!(owned.contains(&7));
    }

    #[test]
    fn test_task_history_other_season_ignored() {
        let sub = subscription("Show", Some(2));
        let history = vec!["Show.S01E07.720p".to_string()];
        let owned = merge_owned_episodes(&sub, 2, &[], &history, &[]);
        assert!(owned.is_empty());
    }

    #[test]
    fn test_seasonless_history_counts_toward_any_season() {
        let sub = subscription("Show", Some(2));
        let history = vec!["[Group] Show EP07 [720p]".to_string()];
        let owned = merge_owned_episodes(&sub, 2, &[], &history, &[]);
        assert!(owned.contains(&7));
    }

    #[test]
    fn test_decision_serializes_for_api_consumers() {
        let parsed = parse_episode_id("Show.S01E03.1080p");
        let owned: HashSet<i32> = [3].into_iter().collect();
        let decision = evaluate_candidate(parsed.as_ref(), owned);

        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["is_redundant"], serde_json::json!(true));
        assert_eq!(json["downloaded_episodes"], serde_json::json!([3]));
    }

    #[test]
    fn test_cross_task_history_requires_title_match() {
        let sub = subscription("Breaking Good", Some(2));
        let other = vec![
            "Breaking Good S02E05".to_string(),
            "Unrelated Show S02E09".to_string(),
        ];
        let owned = merge_owned_episodes(&sub, 2, &[], &[], &other);
        assert!(owned.contains(&5));
        assert!(!owned.contains(&9));
    }
}
