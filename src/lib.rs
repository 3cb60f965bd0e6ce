//! m3u8-downloader - download HLS streams
//!
//! This library downloads the segments of an HLS (m3u8) playlist and turns
//! them into a single playable file.
//!
//! # Features
//!
//! - Master and media playlist parsing
//! - Variant stream selection
//! - AES-128 segment decryption
//! - Parallel downloads with rate limiting and retry logic
//! - Cooperative cancellation with live progress
//! - Merging and MP4 conversion through ffmpeg
//!
//! # Example
//!
//! ```no_run
//! use m3u8_downloader::{download, ConversionLevel};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let result = download(
//!         "https://example.com/live/index.m3u8",
//!         ConversionLevel::Merged,
//!         "videos",
//!         "episode",
//!         8,
//!         true,
//!     )
//!     .await?;
//!
//!     println!("{} segments saved", result.succeeded_count());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod fs;
pub mod output;
pub mod playlist;

// Re-exports for convenience
pub use config::{Config, ConversionLevel, VariantPolicy};
pub use download::{
    download, start_with_options, DownloadOptions, DownloadResult, DownloadStatus, Downloader,
    Event, StageOutcome,
};
pub use error::{Error, Result};
pub use playlist::{parse_playlist, Manifest, MediaPlaylist, Segment, VariantStream};
