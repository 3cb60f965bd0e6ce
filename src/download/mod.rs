//! Download module for HLS playlists.
//!
//! This module provides:
//! - HTTP fetching with rate limiting and retries
//! - Master playlist resolution
//! - Decryption key resolution and AES-128 decryption
//! - The segment worker pool
//! - Merging and MP4 conversion
//! - Live status and the final result

pub mod client;
pub mod decrypt;
pub mod job;
pub mod keys;
pub mod merge;
pub mod options;
pub mod resolve;
pub mod retry;
pub mod status;
pub mod transcode;

#[cfg(test)]
pub mod testing;

pub use client::{Fetch, HttpClient};
pub use job::{download, start_with_options, Downloader};
pub use options::{DownloadOptions, PipelinePlan};
pub use retry::RetryPolicy;
pub use status::{DownloadResult, DownloadStatus, Event, StageOutcome};
pub use transcode::{Ffmpeg, Transcoder};
