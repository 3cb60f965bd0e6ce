//! Error types for the m3u8-downloader crate.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // Playlist errors
    #[error("line:{line}, {reason} (\"{text}\")")]
    MalformedManifest {
        line: usize,
        text: String,
        reason: String,
    },

    #[error("URI '{uri}' cannot be resolved: {reason}")]
    UnresolvableUri { uri: String, reason: String },

    #[error("{url} is a master playlist with {variants} streams, but no variant selector is set")]
    MissingSelector { url: String, variants: usize },

    #[error("Variant selector chose stream {index}, but only {count} are available")]
    InvalidSelection { index: usize, count: usize },

    #[error("Playlist nesting exceeds {0} levels")]
    ManifestTooDeep(usize),

    #[error("Playlist {0} contains no segments")]
    EmptyPlaylist(String),

    // Transport errors
    #[error("GET {url} answered with HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("GET {url} failed after {attempts} attempts: {message}")]
    Transport {
        url: String,
        attempts: u32,
        message: String,
    },

    // Decryption errors
    #[error("Decryption error: {0}")]
    Encryption(String),

    // File system errors
    #[error("Filesystem error at {}: {message}", path.display())]
    Filesystem { path: PathBuf, message: String },

    #[error("Invalid filename (path traversal attempt): {0}")]
    InvalidFilename(String),

    // External tool errors
    #[error("FFmpeg error: {0}")]
    FFmpeg(String),

    #[error("FFmpeg not found. Please install ffmpeg and ensure it's in your PATH.")]
    FFmpegNotFound,

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // URL parsing errors
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a filesystem error for `path` from any displayable cause.
    pub fn filesystem(path: impl Into<PathBuf>, cause: impl std::fmt::Display) -> Self {
        Error::Filesystem {
            path: path.into(),
            message: cause.to_string(),
        }
    }

    /// Whether this error was raised while reading or resolving a playlist.
    pub fn is_playlist_error(&self) -> bool {
        matches!(
            self,
            Error::MalformedManifest { .. }
                | Error::UnresolvableUri { .. }
                | Error::MissingSelector { .. }
                | Error::InvalidSelection { .. }
                | Error::ManifestTooDeep(_)
                | Error::EmptyPlaylist(_)
        )
    }
}

/// Process exit codes for the command-line tool.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const CONFIG_ERROR: i32 = 3;
    pub const PLAYLIST_ERROR: i32 = 2;
    pub const DOWNLOAD_ERROR: i32 = 4;
    pub const UNEXPECTED_ERROR: i32 = 5;
    pub const PARTIAL_FAILURE: i32 = 6;
}
