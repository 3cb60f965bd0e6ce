//! Decryption key resolution.

use std::collections::{HashMap, HashSet};

use futures::stream::{self, StreamExt};

use crate::download::client::Fetch;
use crate::download::retry::{fetch_with_retry, RetryPolicy};
use crate::playlist::Segment;

/// Fetch every distinct key referenced by `segments` once, concurrently, and
/// attach it to each segment that uses it.
///
/// Segments whose key cannot be fetched are marked failed. Their indexes are
/// returned so the caller can report them; they must not be downloaded.
pub async fn resolve_keys(
    fetcher: &dyn Fetch,
    retry: &RetryPolicy,
    segments: &mut [Segment],
    concurrency: usize,
) -> Vec<usize> {
    let mut seen = HashSet::new();
    let urls: Vec<String> = segments
        .iter()
        .filter(|s| s.is_encrypted() && !s.encryption.key_url.is_empty())
        .map(|s| s.encryption.key_url.clone())
        .filter(|url| seen.insert(url.clone()))
        .collect();

    if !urls.is_empty() {
        tracing::info!("Fetching {} decryption key(s)", urls.len());
    }

    let keys: HashMap<String, Result<Vec<u8>, String>> = stream::iter(urls)
        .map(|url| async move {
            let key = fetch_with_retry(fetcher, &url, retry)
                .await
                .map_err(|e| e.to_string());
            (url, key)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut failed = Vec::new();
    for segment in segments.iter_mut().filter(|s| s.is_encrypted()) {
        let url = segment.encryption.key_url.clone();
        match keys.get(&url) {
            Some(Ok(key)) => segment.encryption.key = key.clone(),
            Some(Err(e)) => {
                segment.fail(format!("fetch key {} error, {}", url, e));
                failed.push(segment.index);
            }
            None => {
                segment.fail("AES-128 segment has no key URI");
                failed.push(segment.index);
            }
        }
    }

    if !failed.is_empty() {
        tracing::warn!("{} segment(s) skipped: decryption key unavailable", failed.len());
    }

    failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::testing::MockFetcher;
    use crate::playlist::{parse_playlist, Manifest};
    use std::time::Duration;

    const PLAYLIST: &str = "#EXTM3U
#EXT-X-KEY:METHOD=AES-128,URI=\"good.key\"
a.ts
b.ts
#EXT-X-KEY:METHOD=AES-128,URI=\"bad.key\"
c.ts
#EXT-X-KEY:METHOD=NONE
d.ts
#EXT-X-KEY:METHOD=AES-128
e.ts
";

    fn segments() -> Vec<Segment> {
        match parse_playlist(PLAYLIST, "http://test/v/index.m3u8").unwrap() {
            Manifest::Media(media) => media.segments,
            Manifest::Master(_) => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_resolve_keys() {
        let fetcher = MockFetcher::new().with("http://test/v/good.key", "0123456789abcdef");
        let retry = RetryPolicy::new(2, Duration::from_millis(1));
        let mut segments = segments();

        let failed = resolve_keys(&fetcher, &retry, &mut segments, 4).await;

        assert_eq!(failed, vec![2, 4]);
        assert_eq!(fetcher.calls_to("http://test/v/good.key"), 1);
        assert_eq!(fetcher.calls_to("http://test/v/bad.key"), 2);

        assert_eq!(segments[0].encryption.key, b"0123456789abcdef");
        assert_eq!(segments[1].encryption.key, b"0123456789abcdef");
        assert!(!segments[0].is_failed());
        assert!(segments[2].error_message.contains("bad.key"));
        assert!(segments[3].encryption.key.is_empty());
        assert!(!segments[3].is_failed());
        assert!(segments[4].is_failed());
    }

    #[tokio::test]
    async fn test_no_keys_no_requests() {
        let fetcher = MockFetcher::new();
        let mut segments = vec![Segment::default(), Segment::default()];
        let failed = resolve_keys(&fetcher, &RetryPolicy::default(), &mut segments, 2).await;
        assert!(failed.is_empty());
        assert_eq!(fetcher.total_calls(), 0);
    }
}
