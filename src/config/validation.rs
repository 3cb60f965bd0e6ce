//! Configuration validation logic.

use url::Url;

use crate::config::loader::{Config, NetworkConfig};
use crate::download::options::{DownloadOptions, PipelinePlan};
use crate::error::{Error, Result};
use crate::fs::sanitize_filename;

/// Upper bound on parallel workers accepted from the config file or CLI.
const MAX_WORKERS: i64 = 256;

/// Validate the file/CLI configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_workers(config.download.workers)?;
    validate_network(&config.network)?;

    if let Some(prefix) = &config.download.output_file_prefix {
        validate_prefix(prefix)?;
    }

    Ok(())
}

/// Validate options right before a job starts. Runs before any network access.
///
/// The pipeline plan is checked separately with [`validate_plan`], since a
/// job may run a plan other than the one its conversion level implies.
pub fn validate_options(options: &DownloadOptions) -> Result<()> {
    validate_manifest_url(&options.manifest_url)?;
    validate_network(&options.network)?;

    if !options.output_file_prefix.trim().is_empty() {
        validate_prefix(&options.output_file_prefix)?;
    }

    Ok(())
}

/// The playlist URL must be an absolute http(s) URL.
pub fn validate_manifest_url(link: &str) -> Result<()> {
    let url = Url::parse(link.trim()).map_err(|e| Error::ConfigValidation {
        field: "manifest_url".to_string(),
        message: format!("'{}' is not an absolute URL: {}", link, e),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::ConfigValidation {
            field: "manifest_url".to_string(),
            message: format!("Unsupported scheme '{}'", url.scheme()),
        });
    }

    Ok(())
}

/// Converting requires the merged file to exist first.
pub fn validate_plan(plan: PipelinePlan) -> Result<()> {
    if plan.convert && !plan.merge {
        return Err(Error::Config(
            "Converting to mp4 requires merging to be enabled".to_string(),
        ));
    }
    Ok(())
}

fn validate_workers(workers: i64) -> Result<()> {
    if workers > MAX_WORKERS {
        return Err(Error::ConfigValidation {
            field: "workers".to_string(),
            message: format!("At most {} workers are allowed (got {})", MAX_WORKERS, workers),
        });
    }
    Ok(())
}

fn validate_network(network: &NetworkConfig) -> Result<()> {
    if network.timeout_secs == 0 {
        return Err(Error::ConfigValidation {
            field: "timeout_secs".to_string(),
            message: "Timeout must be at least one second".to_string(),
        });
    }

    if network.max_attempts == 0 {
        return Err(Error::ConfigValidation {
            field: "max_attempts".to_string(),
            message: "At least one attempt is required".to_string(),
        });
    }

    Ok(())
}

fn validate_prefix(prefix: &str) -> Result<()> {
    sanitize_filename(prefix.trim()).map_err(|e| Error::ConfigValidation {
        field: "output_file_prefix".to_string(),
        message: e.to_string(),
    })?;
    Ok(())
}
