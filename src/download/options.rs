//! Per-job download options.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{Config, ConversionLevel, NetworkConfig};
use crate::playlist::{largest_resolution, selector_for, VariantSelector};

/// Worker count used when the configured value is not positive.
pub const DEFAULT_WORKERS: usize = 10;

/// Everything one download job needs to know.
#[derive(Clone)]
pub struct DownloadOptions {
    /// Absolute http(s) URL of the master or media playlist.
    pub manifest_url: String,
    pub conversion_level: ConversionLevel,
    /// Outbound request budget; values <= 0 disable limiting.
    pub requests_per_second: i64,
    /// Parallel segment downloads; values <= 0 mean [`DEFAULT_WORKERS`].
    pub worker_count: i64,
    /// Required when the playlist is a master with several variants.
    pub variant_selector: Option<VariantSelector>,
    pub remove_intermediate_segments: bool,
    /// Empty means a timestamped directory in the working directory.
    pub output_directory: PathBuf,
    /// Empty means a timestamped prefix.
    pub output_file_prefix: String,
    pub network: NetworkConfig,
}

impl fmt::Debug for DownloadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadOptions")
            .field("manifest_url", &self.manifest_url)
            .field("conversion_level", &self.conversion_level)
            .field("requests_per_second", &self.requests_per_second)
            .field("worker_count", &self.worker_count)
            .field("variant_selector", &self.variant_selector.is_some())
            .field(
                "remove_intermediate_segments",
                &self.remove_intermediate_segments,
            )
            .field("output_directory", &self.output_directory)
            .field("output_file_prefix", &self.output_file_prefix)
            .field("network", &self.network)
            .finish()
    }
}

impl DownloadOptions {
    /// Options with the usual defaults: MP4 output, largest resolution,
    /// intermediate files removed, twice as many requests per second as workers.
    pub fn new(
        manifest_url: impl Into<String>,
        output_directory: impl Into<PathBuf>,
        output_file_prefix: impl Into<String>,
        worker_count: i64,
    ) -> Self {
        let workers = effective_workers(worker_count);
        Self {
            manifest_url: manifest_url.into(),
            conversion_level: ConversionLevel::default(),
            requests_per_second: (workers * 2) as i64,
            worker_count,
            variant_selector: Some(Arc::new(largest_resolution)),
            remove_intermediate_segments: true,
            output_directory: output_directory.into(),
            output_file_prefix: output_file_prefix.into(),
            network: NetworkConfig::default(),
        }
    }

    /// Options for `manifest_url` taken from a loaded configuration.
    pub fn from_config(manifest_url: impl Into<String>, config: &Config) -> Self {
        let download = &config.download;
        let mut options = Self::new(
            manifest_url,
            download.output_directory.clone().unwrap_or_default(),
            download.output_file_prefix.clone().unwrap_or_default(),
            download.workers,
        );

        if let Some(rps) = download.requests_per_second {
            options.requests_per_second = rps;
        }
        options.conversion_level = download.conversion_level;
        options.remove_intermediate_segments = download.remove_intermediate_segments;
        options.variant_selector = Some(selector_for(download.variant_policy));
        options.network = config.network.clone();
        options
    }

    /// Number of workers actually started.
    pub fn workers(&self) -> usize {
        effective_workers(self.worker_count)
    }

    /// Tokens per second for the shared limiter, `None` when unlimited.
    pub fn rate_limit(&self) -> Option<u32> {
        if self.requests_per_second <= 0 {
            None
        } else {
            Some(u32::try_from(self.requests_per_second).unwrap_or(u32::MAX))
        }
    }

    pub fn plan(&self) -> PipelinePlan {
        PipelinePlan::from(self.conversion_level)
    }
}

fn effective_workers(worker_count: i64) -> usize {
    if worker_count <= 0 {
        DEFAULT_WORKERS
    } else {
        usize::try_from(worker_count).unwrap_or(DEFAULT_WORKERS)
    }
}

/// Post-download stages to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelinePlan {
    pub merge: bool,
    pub convert: bool,
}

impl From<ConversionLevel> for PipelinePlan {
    fn from(level: ConversionLevel) -> Self {
        Self {
            merge: level >= ConversionLevel::Merged,
            convert: level >= ConversionLevel::Mp4,
        }
    }
}
