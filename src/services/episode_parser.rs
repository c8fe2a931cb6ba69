//! Episode identifier parser for scene-style release titles
//!
//! Parses titles like:
//! - "Show.S01E05.1080p.WEB.h264-GROUP"
//! - "Show S01E01-E03 Complete"
//! - "[Group] Show EP08 [1080p]"
//! - "Show.S02.2160p.Complete.Pack"
//!
//! Patterns are tried in strict priority order and the first match wins.
//! Season+episode forms are more specific than the season-only fallback and
//! must be tried first, otherwise a normal episode release would be
//! misclassified as a season pack.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Structured season/episode identifier parsed from a free-text title.
///
/// `season: Some(_)` with empty `episodes` is a season pack. An unparseable
/// title is `None` at the call site, never a value of this type, so the two
/// cases stay structurally distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeId {
    pub season: Option<i32>,
    /// Deduplicated, ascending
    pub episodes: Vec<i32>,
}

impl EpisodeId {
    /// A whole-season release without per-episode titling
    pub fn is_season_pack(&self) -> bool {
        self.season.is_some() && self.episodes.is_empty()
    }
}

// S01E05 / S01E01-E03 / S01E01-03
static SEASON_EPISODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)S(\d{1,2})\s*E(\d{1,4})(?:\s*-\s*E?(\d{1,4}))?").unwrap()
});

// Delimiter-bounded E05 / EP05 / E01-E03, to avoid false positives inside
// arbitrary numeric substrings
static EPISODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[\s\[\](){}._-])EP?(\d{1,4})(?:\s*-\s*(?:EP?)?(\d{1,4}))?(?:[\s\[\](){}._-]|$)")
        .unwrap()
});

// Standalone S01 token, bounded on both sides
static SEASON_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[\s\[\](){}._-])S(\d{1,2})(?:[\s\[\](){}._-]|$)").unwrap()
});

// "Season 2" spelled out
static SEASON_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Season[\s._-]*(\d{1,2})").unwrap());

// Compact 1x01 form
static COMPACT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^0-9a-z])(\d{1,2})x(\d{2,3})(?:[^0-9]|$)").unwrap()
});

/// Parse a release title into a structured episode identifier.
///
/// Returns `None` when the title carries no recognizable season or episode
/// marker. A title with an episode marker but no season anywhere yields
/// `season: None`; callers must substitute the subscription's configured
/// season before using the result for ledger lookups.
pub fn parse_episode_id(title: &str) -> Option<EpisodeId> {
    // Pattern 1: S01E05, optionally ranged
    if let Some(caps) = SEASON_EPISODE_RE.captures(title) {
        let season = caps.get(1).and_then(|m| m.as_str().parse().ok());
        let start: Option<i32> = caps.get(2).and_then(|m| m.as_str().parse().ok());
        let end: Option<i32> = caps.get(3).and_then(|m| m.as_str().parse().ok());
        if let Some(start) = start {
            let episodes = expand_range(start, end);
            if !episodes.is_empty() {
                return Some(EpisodeId { season, episodes });
            }
        }
    }

    // Pattern 2: standalone episode token, season searched independently
    if let Some(caps) = EPISODE_RE.captures(title) {
        let start: Option<i32> = caps.get(1).and_then(|m| m.as_str().parse().ok());
        let end: Option<i32> = caps.get(2).and_then(|m| m.as_str().parse().ok());
        if let Some(start) = start {
            let episodes = expand_range(start, end);
            if !episodes.is_empty() {
                return Some(EpisodeId {
                    season: find_season(title),
                    episodes,
                });
            }
        }
    }

    // Pattern 3: compact 1x01 form
    if let Some(caps) = COMPACT_RE.captures(title) {
        let season = caps.get(1).and_then(|m| m.as_str().parse().ok());
        let episode: Option<i32> = caps.get(2).and_then(|m| m.as_str().parse().ok());
        if let Some(episode) = episode.filter(|&e| e > 0) {
            return Some(EpisodeId {
                season,
                episodes: vec![episode],
            });
        }
    }

    // Pattern 4: season token with no episode marker anywhere - a season pack
    if let Some(season) = find_season(title) {
        return Some(EpisodeId {
            season: Some(season),
            episodes: Vec::new(),
        });
    }

    None
}

/// Search for a season token independent of any episode marker
fn find_season(title: &str) -> Option<i32> {
    if let Some(caps) = SEASON_TOKEN_RE.captures(title) {
        return caps.get(1).and_then(|m| m.as_str().parse().ok());
    }
    if let Some(caps) = SEASON_WORD_RE.captures(title) {
        return caps.get(1).and_then(|m| m.as_str().parse().ok());
    }
    None
}

/// Expand an episode range to the inclusive integer list.
///
/// A descending or absurdly wide range is kept as the two endpoint episodes
/// instead (malformed-range fallback). Output is deduplicated and ascending,
/// non-positive numbers dropped.
fn expand_range(start: i32, end: Option<i32>) -> Vec<i32> {
    let mut episodes = match end {
        None => vec![start],
        Some(end) if end >= start && end - start < 100 => (start..=end).collect(),
        Some(end) => vec![start, end],
    };

    episodes.retain(|&e| e > 0);
    episodes.sort_unstable();
    episodes.dedup();
    episodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_single_episode() {
        let id = parse_episode_id("Show.S01E05.mkv").unwrap();
        assert_eq!(id.season, Some(1));
        assert_eq!(id.episodes, vec![5]);
        assert!(!id.is_season_pack());
    }

    #[test]
    fn test_parse_episode_range() {
        let id = parse_episode_id("Show.S01E01-E03.mkv").unwrap();
        assert_eq!(id.season, Some(1));
        assert_eq!(id.episodes, vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_range_without_second_prefix() {
        let id = parse_episode_id("Show S02E08-10 1080p").unwrap();
        assert_eq!(id.season, Some(2));
        assert_eq!(id.episodes, vec![8, 9, 10]);
    }

    #[test]
    fn test_malformed_range_keeps_endpoints() {
        // Descending range cannot be expanded; keep the two episodes
        let id = parse_episode_id("Show S01E09-E03").unwrap();
        assert_eq!(id.episodes, vec![3, 9]);
    }

    #[test]
    fn test_parse_season_pack() {
        let id = parse_episode_id("Show.S01.Complete.mkv").unwrap();
        assert_eq!(id.season, Some(1));
        assert!(id.episodes.is_empty());
        assert!(id.is_season_pack());
    }

    #[test]
    fn test_parse_season_word_pack() {
        let id = parse_episode_id("Show Season 3 Complete 2160p").unwrap();
        assert_eq!(id.season, Some(3));
        assert!(id.is_season_pack());
    }

    #[test]
    fn test_standalone_episode_with_separate_season() {
        let id = parse_episode_id("Show.S01.E05.1080p.mkv").unwrap();
        assert_eq!(id.season, Some(1));
        assert_eq!(id.episodes, vec![5]);
    }

    #[test]
    fn test_standalone_episode_without_season() {
        let id = parse_episode_id("[Group] Show EP08 [1080p]").unwrap();
        assert_eq!(id.season, None);
        assert_eq!(id.episodes, vec![8]);
    }

    #[test]
    fn test_compact_form() {
        let id = parse_episode_id("Show 1x01 HDTV").unwrap();
        assert_eq!(id.season, Some(1));
        assert_eq!(id.episodes, vec![1]);
    }

    #[test]
    fn test_unparseable() {
        assert_matches!(parse_episode_id("randomfile.mkv"), None);
        assert_matches!(parse_episode_id("Some Movie 2024 1080p BluRay"), None);
    }

    #[test]
    fn test_resolution_is_not_an_episode() {
        // 1920x1080 must not be read as season 19 / episode 20
        assert_matches!(parse_episode_id("Some Clip 1920x1080"), None);
    }

    #[test]
    fn test_episode_form_wins_over_pack() {
        // Priority order: S01E05 must never be classified as a pack
        let id = parse_episode_id("Show S01E05 REPACK S01").unwrap();
        assert!(!id.is_season_pack());
        assert_eq!(id.episodes, vec![5]);
    }

    #[test]
    fn test_duplicate_endpoints_deduplicated() {
        let id = parse_episode_id("Show S01E05-E05").unwrap();
        assert_eq!(id.episodes, vec![5]);
    }
}
