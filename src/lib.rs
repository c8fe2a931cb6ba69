//! Trackarr - episode state tracking and selective download engine
//!
//! Decides whether a newly discovered release for a TV-series subscription is
//! already owned, which files inside a season pack are actually new, and
//! guarantees that a download is recorded at most once even when submission
//! to the download backend fails.

pub mod config;
pub mod db;
pub mod jobs;
pub mod services;
