//! Filesystem module.
//!
//! Provides:
//! - Output directory creation
//! - Output file naming

pub mod naming;
pub mod paths;

pub use naming::{default_file_prefix, default_output_directory, sanitize_filename};
pub use paths::{ensure_dir, OutputLayout};
