//! Command-line argument definitions using clap.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::{Config, ConversionLevel, VariantPolicy};

/// HLS (m3u8) downloader CLI.
#[derive(Parser, Debug)]
#[command(
    name = "m3u8-downloader",
    version,
    about = "Download an HLS (m3u8) stream",
    long_about = "Download every segment of an HLS playlist in parallel, decrypt AES-128 \
                  segments, merge them into one .ts file and optionally convert it to .mp4.\n\n\
                  Master playlists are resolved to a single variant first."
)]
pub struct Args {
    /// URL of the master or media playlist.
    pub url: String,

    /// Number of parallel segment downloads.
    #[arg(short, long, env = "M3U8_WORKERS")]
    pub workers: Option<i64>,

    /// Output directory.
    #[arg(short = 'o', long = "output", env = "M3U8_OUTPUT_DIR")]
    pub output_directory: Option<PathBuf>,

    /// File name prefix for segments and output files.
    #[arg(short = 'n', long = "name")]
    pub output_file_prefix: Option<String>,

    /// How far to run the pipeline.
    #[arg(long, value_enum)]
    pub level: Option<LevelArg>,

    /// Requests per second across all workers (0 disables limiting).
    #[arg(long)]
    pub rps: Option<i64>,

    /// Keep the .ts segments after merging.
    #[arg(long)]
    pub keep_segments: bool,

    /// Variant choice for master playlists.
    #[arg(long, value_enum)]
    pub variant: Option<VariantArg>,

    /// Path to configuration file.
    #[arg(short, long, default_value = "m3u8-downloader.toml")]
    pub config: PathBuf,

    /// Hide the progress bar.
    #[arg(long)]
    pub no_progress: bool,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,
}

/// CLI conversion level argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LevelArg {
    /// Only download the segments.
    Segments,
    /// Download and merge into one .ts file.
    Merged,
    /// Download, merge and convert to .mp4.
    Mp4,
}

impl From<LevelArg> for ConversionLevel {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::Segments => ConversionLevel::Segments,
            LevelArg::Merged => ConversionLevel::Merged,
            LevelArg::Mp4 => ConversionLevel::Mp4,
        }
    }
}

/// CLI variant policy argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum VariantArg {
    /// Largest width x height.
    LargestResolution,
    /// Highest declared bandwidth.
    HighestBandwidth,
    /// Lowest declared bandwidth.
    LowestBandwidth,
}

impl From<VariantArg> for VariantPolicy {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::LargestResolution => VariantPolicy::LargestResolution,
            VariantArg::HighestBandwidth => VariantPolicy::HighestBandwidth,
            VariantArg::LowestBandwidth => VariantPolicy::LowestBandwidth,
        }
    }
}

impl Args {
    /// Merge CLI arguments into an existing config, overriding where specified.
    pub fn merge_into_config(&self, config: &mut Config) {
        let download = &mut config.download;

        if let Some(workers) = self.workers {
            download.workers = workers;
        }

        if let Some(dir) = &self.output_directory {
            download.output_directory = Some(dir.clone());
        }

        if let Some(prefix) = &self.output_file_prefix {
            download.output_file_prefix = Some(prefix.clone());
        }

        if let Some(level) = self.level {
            download.conversion_level = level.into();
        }

        if let Some(rps) = self.rps {
            download.requests_per_second = Some(rps);
        }

        if let Some(variant) = self.variant {
            download.variant_policy = variant.into();
        }

        // Boolean flags (only override if set to non-default)
        if self.keep_segments {
            download.remove_intermediate_segments = false;
        }

        if self.no_progress || self.json {
            download.show_progress = false;
        }
    }
}
