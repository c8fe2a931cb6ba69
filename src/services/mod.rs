//! Engine services

pub mod download;
pub mod download_backend;
pub mod episode_parser;
pub mod existence;
pub mod file_selector;
pub mod text_match;

pub use download::{execute_download, pre_record, DownloadOutcome, DownloadRequest};
pub use download_backend::{
    BackendError, DownloadBackend, RemoteFile, SubmitOptions, SubmitOutcome,
};
pub use episode_parser::{parse_episode_id, EpisodeId};
pub use existence::{
    check_redundancy, evaluate_candidate, merge_owned_episodes, resolve_target_season,
    CandidateItem, RedundancyDecision,
};
pub use file_selector::{has_new_episodes, is_video_file, select_files};
pub use text_match::{normalize_title, title_matches_subscription};
