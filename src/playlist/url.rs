//! Resolution of URIs found inside a playlist.

use url::Url;

use crate::error::{Error, Result};

/// Parse the URL a playlist was fetched from. It must be absolute.
pub fn parse_base_url(link: &str) -> Result<Url> {
    Url::parse(link.trim()).map_err(|e| Error::UnresolvableUri {
        uri: link.to_string(),
        reason: format!("playlist URL must be absolute ({})", e),
    })
}

/// Resolve a potentially relative URI against the playlist's own URL.
///
/// Absolute (`https://host/a.ts`), scheme-relative (`//cdn/a.ts`), root-relative
/// (`/a.ts`) and path-relative (`a.ts`) references are all accepted.
pub fn resolve_url(base: &Url, uri: &str) -> Result<String> {
    let uri = uri.trim();
    if uri.is_empty() {
        return Err(Error::UnresolvableUri {
            uri: uri.to_string(),
            reason: "empty URI".to_string(),
        });
    }

    if uri.starts_with("http://") || uri.starts_with("https://") {
        let absolute = Url::parse(uri).map_err(|e| Error::UnresolvableUri {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        return Ok(absolute.to_string());
    }

    let resolved = base.join(uri).map_err(|e| Error::UnresolvableUri {
        uri: uri.to_string(),
        reason: e.to_string(),
    })?;
    Ok(resolved.to_string())
}
