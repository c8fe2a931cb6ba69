//! Download backend abstraction
//!
//! Universal interface for an external download client (qBittorrent,
//! Transmission, ...). The engine never talks to a concrete client; it
//! submits through this trait and inspects torrent file lists through it.
//! Implementations live with the deployment, test doubles live with the
//! tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A file inside a multi-file torrent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub name: String,
    pub size: i64,
}

/// Options forwarded to the backend on submission
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    pub save_path: Option<String>,
    pub category: Option<String>,
    /// 0-based indices into the torrent's file list; only honored by
    /// data-upload submissions
    pub file_indices: Option<Vec<usize>>,
}

/// Backend's answer to a submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub success: bool,
    pub message: String,
}

impl SubmitOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: String::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Transport-level backend failures. A timeout is treated identically to an
/// explicit refusal by callers.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(String),

    #[error("torrent not found: {0}")]
    NotFound(String),
}

/// Universal interface for any download backend
#[async_trait]
pub trait DownloadBackend: Send + Sync {
    /// Human-readable name (for logging)
    fn name(&self) -> &str;

    /// Submit by URL or magnet link. File selection is not available in this
    /// path; the whole torrent is fetched.
    async fn submit_url(
        &self,
        url: &str,
        options: &SubmitOptions,
    ) -> Result<SubmitOutcome, BackendError>;

    /// Submit raw torrent data (base64), honoring `file_indices` for
    /// selective retrieval.
    async fn submit_data(
        &self,
        payload_base64: &str,
        options: &SubmitOptions,
    ) -> Result<SubmitOutcome, BackendError>;

    /// List the files of a torrent known to this backend
    async fn list_files(&self, torrent_hash: &str) -> Result<Vec<RemoteFile>, BackendError>;
}
