//! Season-pack file selection
//!
//! Given a torrent's file list and the episodes already owned, decides which
//! files are worth fetching. Anything the parser cannot place is kept: a
//! wrongly dropped episode is expensive, a stray `.nfo` is not.

use std::collections::HashSet;

use crate::services::download_backend::RemoteFile;
use crate::services::episode_parser::parse_episode_id;

/// Video file extensions (lowercase)
pub const VIDEO_EXTENSIONS: &[&str] = &[
    ".mkv", ".mp4", ".avi", ".mov", ".wmv", ".flv", ".webm", ".m4v", ".ts", ".m2ts", ".mpg",
    ".mpeg", ".rmvb",
];

/// Check if a file is a video file based on extension
pub fn is_video_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    VIDEO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Select the files of a torrent that are new for this subscription.
///
/// Returns 0-based indices into `files`, in file-list order. Per file, first
/// matching rule wins:
/// - nothing owned yet: select every file
/// - unparseable name or no episode numbers: select (metadata, subtitles,
///   unusual naming)
/// - parsed season differs from the target season: select (never seen)
/// - otherwise: select iff at least one parsed episode is not yet owned
pub fn select_files(
    files: &[RemoteFile],
    downloaded_episodes: &HashSet<i32>,
    target_season: Option<i32>,
) -> Vec<usize> {
    if downloaded_episodes.is_empty() {
        return (0..files.len()).collect();
    }

    files
        .iter()
        .enumerate()
        .filter(|(_, file)| {
            let Some(parsed) = parse_episode_id(&file.name) else {
                return true;
            };
            if parsed.episodes.is_empty() {
                return true;
            }
            if parsed.season.is_some() && parsed.season != target_season {
                return true;
            }
            parsed
                .episodes
                .iter()
                .any(|episode| !downloaded_episodes.contains(episode))
        })
        .map(|(index, _)| index)
        .collect()
}

/// Does the selection contain at least one video file?
///
/// Callers use this to decide whether a season-pack torrent is worth
/// submitting at all.
pub fn has_new_episodes(files: &[RemoteFile], selection: &[usize]) -> bool {
    selection
        .iter()
        .filter_map(|&index| files.get(index))
        .any(|file| is_video_file(&file.name))
}
