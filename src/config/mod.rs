//! Configuration module for the m3u8-downloader.
//!
//! This module handles:
//! - Loading configuration from TOML files
//! - Conversion level and variant policy definitions
//! - Configuration validation

pub mod loader;
pub mod modes;
pub mod validation;

pub use loader::{Config, DownloadConfig, NetworkConfig};
pub use modes::{ConversionLevel, VariantPolicy};
pub use validation::{validate_config, validate_options};
