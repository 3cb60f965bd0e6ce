//! Follow master playlists down to a single media playlist.

use crate::download::client::Fetch;
use crate::download::retry::{fetch_with_retry, RetryPolicy};
use crate::error::{Error, Result};
use crate::playlist::{parse_playlist, Manifest, MediaPlaylist, VariantSelector, VariantStream};

/// Maximum number of playlists fetched while resolving one URL.
pub const MAX_MANIFEST_DEPTH: usize = 10;

/// Fetch and parse `manifest_url`, following variant streams until a media
/// playlist is reached.
///
/// A master playlist with one variant is followed directly; with several the
/// selector decides.
pub async fn resolve_media_playlist(
    fetcher: &dyn Fetch,
    retry: &RetryPolicy,
    manifest_url: &str,
    selector: Option<&VariantSelector>,
) -> Result<MediaPlaylist> {
    let mut url = manifest_url.trim().to_string();

    for depth in 0..MAX_MANIFEST_DEPTH {
        let body = fetch_with_retry(fetcher, &url, retry).await?;
        let content = String::from_utf8_lossy(&body);

        match parse_playlist(&content, &url)? {
            Manifest::Media(media) => {
                if media.segments.is_empty() {
                    return Err(Error::EmptyPlaylist(url));
                }
                tracing::info!("Playlist {} has {} segments", url, media.segments.len());
                return Ok(media);
            }
            Manifest::Master(master) => {
                let next = choose_variant(&url, &master.variants, selector)?;
                tracing::debug!(depth, from = %url, to = %next, "Following variant stream");
                url = next;
            }
        }
    }

    Err(Error::ManifestTooDeep(MAX_MANIFEST_DEPTH))
}

fn choose_variant(
    url: &str,
    variants: &[VariantStream],
    selector: Option<&VariantSelector>,
) -> Result<String> {
    if let [only] = variants {
        return Ok(only.manifest_url.clone());
    }

    let selector = selector.ok_or_else(|| Error::MissingSelector {
        url: url.to_string(),
        variants: variants.len(),
    })?;

    let index = selector(variants);
    let chosen = variants.get(index).ok_or(Error::InvalidSelection {
        index,
        count: variants.len(),
    })?;

    tracing::info!(
        "Selected variant {} ({} bps, {})",
        chosen.manifest_url,
        chosen.bandwidth,
        chosen.resolution
    );
    Ok(chosen.manifest_url.clone())
}
