//! Typed representation of a parsed playlist.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A parsed playlist: either a list of variant streams or a list of segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Manifest {
    Master(MasterPlaylist),
    Media(MediaPlaylist),
}

impl Manifest {
    /// Variant streams of a master playlist; empty for media playlists.
    pub fn variants(&self) -> &[VariantStream] {
        match self {
            Manifest::Master(master) => &master.variants,
            Manifest::Media(_) => &[],
        }
    }

    /// Segments of a media playlist; empty for master playlists.
    pub fn segments(&self) -> &[Segment] {
        match self {
            Manifest::Master(_) => &[],
            Manifest::Media(media) => &media.segments,
        }
    }
}

/// A playlist listing alternative renditions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MasterPlaylist {
    pub variants: Vec<VariantStream>,
}

/// A playlist listing the downloadable segments in playback order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaPlaylist {
    pub segments: Vec<Segment>,
    pub playlist_type: Option<PlaylistType>,
    pub media_sequence: u64,
    pub end_list: bool,
}

/// One rendition announced by `#EXT-X-STREAM-INF`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VariantStream {
    /// Absolute URL of the rendition's own playlist.
    pub manifest_url: String,
    pub program_id: u64,
    pub bandwidth: u64,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub width: u64,
    pub height: u64,
}

impl Resolution {
    /// Pixel count, saturating on absurd values.
    pub fn area(&self) -> u64 {
        self.width.saturating_mul(self.height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// `#EXT-X-PLAYLIST-TYPE` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlaylistType {
    Vod,
    Event,
}

impl FromStr for PlaylistType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "VOD" => Ok(PlaylistType::Vod),
            "EVENT" => Ok(PlaylistType::Event),
            _ => Err(format!("unknown playlist type {}", s)),
        }
    }
}

/// Encryption methods accepted in `#EXT-X-KEY`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionMethod {
    #[default]
    #[serde(rename = "NONE")]
    None,
    #[serde(rename = "AES-128")]
    Aes128,
}

impl FromStr for EncryptionMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "NONE" => Ok(EncryptionMethod::None),
            "AES-128" => Ok(EncryptionMethod::Aes128),
            _ => Err(format!("unknown encrypt method {}", s)),
        }
    }
}

/// Key information carried from the most recent `#EXT-X-KEY` tag.
///
/// `key` is never filled in by the parser; the key resolver writes it once
/// per distinct `key_url` before any segment is downloaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EncryptionMeta {
    pub key_url: String,
    pub iv: String,
    pub method: EncryptionMethod,
    #[serde(skip)]
    pub key: Vec<u8>,
}

/// One downloadable media fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Segment {
    /// Dense 0-based position in the owning playlist; the merge order.
    pub index: usize,
    pub url: String,
    pub duration: Duration,
    pub sequence: u64,
    pub encryption: EncryptionMeta,
    /// Empty unless a download, decrypt or save failure was recorded.
    pub error_message: String,
}

impl Segment {
    pub fn is_encrypted(&self) -> bool {
        self.encryption.method == EncryptionMethod::Aes128
    }

    pub fn is_failed(&self) -> bool {
        !self.error_message.is_empty()
    }

    /// Record a failure. The first recorded failure wins.
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.error_message.is_empty() {
            self.error_message = message.into();
        }
    }
}
