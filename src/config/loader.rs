//! Configuration structures and loading logic.

use crate::config::modes::{ConversionLevel, VariantPolicy};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub download: DownloadConfig,

    #[serde(default)]
    pub network: NetworkConfig,
}

/// Download pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Number of parallel segment workers (values <= 0 mean 10).
    #[serde(default = "default_workers")]
    pub workers: i64,

    /// Outbound request budget per second; `None` means twice the worker count,
    /// values <= 0 disable limiting.
    #[serde(default)]
    pub requests_per_second: Option<i64>,

    /// How far to run the pipeline (segments, merged, mp4).
    #[serde(default)]
    pub conversion_level: ConversionLevel,

    /// Delete the `.ts` fragments once they are merged.
    #[serde(default = "default_true")]
    pub remove_intermediate_segments: bool,

    /// Directory for segments and output files; a timestamped name when unset.
    #[serde(default)]
    pub output_directory: Option<PathBuf>,

    /// File name prefix; a timestamp when unset.
    #[serde(default)]
    pub output_file_prefix: Option<String>,

    /// Variant choice for master playlists.
    #[serde(default)]
    pub variant_policy: VariantPolicy,

    /// Whether to render a progress bar.
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            requests_per_second: None,
            conversion_level: ConversionLevel::default(),
            remove_intermediate_segments: true,
            output_directory: None,
            output_file_prefix: None,
            variant_policy: VariantPolicy::default(),
            show_progress: true,
        }
    }
}

/// HTTP behaviour shared by playlist, key and segment requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Timeout for a single request attempt.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per request before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Optional User-Agent header.
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            user_agent: None,
        }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

fn default_workers() -> i64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    10
}

fn default_retry_delay_secs() -> u64 {
    10
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!(
                    "Configuration file not found: {}",
                    path.display()
                ))
            } else {
                Error::Io(e)
            }
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No configuration file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.download.workers, 10);
        assert_eq!(config.download.conversion_level, ConversionLevel::Mp4);
        assert!(config.download.remove_intermediate_segments);
        assert_eq!(config.network.timeout(), Duration::from_secs(30));
        assert_eq!(config.network.max_attempts, 10);
        assert_eq!(config.network.retry_delay(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [download]
            workers = 4
            conversion_level = "merged"
            variant_policy = "lowest-bandwidth"

            [network]
            max_attempts = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.download.workers, 4);
        assert_eq!(config.download.conversion_level, ConversionLevel::Merged);
        assert_eq!(config.download.variant_policy, VariantPolicy::LowestBandwidth);
        assert!(config.download.show_progress);
        assert_eq!(config.network.max_attempts, 3);
        assert_eq!(config.network.timeout_secs, 30);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m3u8-downloader.toml");
        std::fs::write(&path, "[download]\nrequests_per_second = 0\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.download.requests_per_second, Some(0));

        let missing = Config::load(&dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(Error::Config(_))));
        assert!(Config::load_or_default(&dir.path().join("missing.toml")).is_ok());
    }
}
