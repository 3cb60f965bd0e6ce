//! Output file naming.

use chrono::{DateTime, Local};

use crate::error::{Error, Result};

/// Validate and sanitize a file name prefix by replacing invalid characters.
///
/// Returns an error if the name contains path traversal patterns.
pub fn sanitize_filename(name: &str) -> Result<String> {
    // Reject path traversal attempts
    if name.contains("..") {
        return Err(Error::InvalidFilename(format!(
            "Path traversal detected: '{}'",
            name
        )));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(Error::InvalidFilename(format!(
            "Path separators not allowed in filename: '{}'",
            name
        )));
    }

    if name.contains('\0') {
        return Err(Error::InvalidFilename(format!(
            "Null bytes not allowed in filename: '{}'",
            name
        )));
    }

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.trim().is_empty() {
        return Err(Error::InvalidFilename(
            "Filename cannot be empty or whitespace-only".to_string(),
        ));
    }

    Ok(sanitized)
}

/// Directory name used when no output directory is configured.
pub fn default_output_directory(now: DateTime<Local>) -> String {
    format!("m3u8_download_{}", now.format("%Y%m%d%H%M%S"))
}

/// File prefix used when no prefix is configured.
pub fn default_file_prefix(now: DateTime<Local>) -> String {
    format!("ts_{}", now.format("%Y%m%d%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sanitize_filename_valid() {
        assert_eq!(sanitize_filename("movie").unwrap(), "movie");
        assert_eq!(sanitize_filename("ep:01?").unwrap(), "ep_01_");
    }

    #[test]
    fn test_sanitize_filename_rejects() {
        assert!(sanitize_filename("../movie").is_err());
        assert!(sanitize_filename("a/b").is_err());
        assert!(sanitize_filename("a\\b").is_err());
        assert!(sanitize_filename("a\0b").is_err());
        assert!(sanitize_filename("   ").is_err());
    }

    #[test]
    fn test_default_names() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(default_output_directory(now), "m3u8_download_20240309070501");
        assert_eq!(default_file_prefix(now), "ts_20240309070501");
    }
}
