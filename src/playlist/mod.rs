//! Playlist module: typed playlists, the parser and URI resolution.

pub mod parser;
pub mod select;
pub mod types;
pub mod url;

pub use parser::{parse_lines, parse_playlist};
pub use select::{largest_resolution, selector_for, VariantSelector};
pub use types::{
    EncryptionMeta, EncryptionMethod, Manifest, MasterPlaylist, MediaPlaylist, PlaylistType,
    Resolution, Segment, VariantStream,
};
pub use url::resolve_url;
