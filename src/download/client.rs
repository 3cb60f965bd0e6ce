//! HTTP fetching for playlists, keys and segments.

use std::num::NonZeroU32;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};

use crate::config::NetworkConfig;
use crate::error::{Error, Result};

/// A single GET attempt. Anything other than HTTP 200 is an error.
///
/// Retrying is the caller's business, see [`crate::download::retry`].
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// reqwest-backed fetcher shared by every request of a job.
///
/// Every request, whether playlist, key or segment, first takes a token from
/// the shared bucket when limiting is enabled.
pub struct HttpClient {
    client: Client,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl HttpClient {
    /// Build a client with a per-attempt timeout and an optional request budget.
    pub fn new(network: &NetworkConfig, requests_per_second: Option<u32>) -> Result<Self> {
        let mut builder = Client::builder().timeout(network.timeout());
        if let Some(user_agent) = &network.user_agent {
            builder = builder.user_agent(user_agent);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        let limiter = requests_per_second
            .and_then(NonZeroU32::new)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));

        Ok(Self { client, limiter })
    }
}

#[async_trait]
impl Fetch for HttpClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        tracing::debug!("GET {} -> {} bytes", url, body.len());
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::retry::{fetch_with_retry, RetryPolicy};
    use std::time::{Duration, Instant};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn serve(server: &MockServer, route: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_get_returns_body_on_200() {
        let server = MockServer::start().await;
        serve(&server, "/v/seg0.ts", 200, "segment bytes").await;

        let client = HttpClient::new(&NetworkConfig::default(), None).unwrap();
        let body = client
            .get(&format!("{}/v/seg0.ts", server.uri()))
            .await
            .unwrap();

        assert_eq!(body, b"segment bytes");
    }

    #[tokio::test]
    async fn test_get_rejects_other_statuses() {
        let server = MockServer::start().await;
        serve(&server, "/missing.ts", 404, "").await;
        serve(&server, "/broken.ts", 500, "").await;
        serve(&server, "/partial.ts", 206, "abc").await;

        let client = HttpClient::new(&NetworkConfig::default(), None).unwrap();
        for (route, expected) in [("/missing.ts", 404), ("/broken.ts", 500), ("/partial.ts", 206)] {
            let url = format!("{}{}", server.uri(), route);
            match client.get(&url).await {
                Err(Error::HttpStatus { url: failed, status }) => {
                    assert_eq!(failed, url);
                    assert_eq!(status, expected);
                }
                other => panic!("unexpected result for {}: {:?}", route, other),
            }
        }
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky.ts"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let client = HttpClient::new(&NetworkConfig::default(), None).unwrap();
        let retry = RetryPolicy::new(3, Duration::from_millis(1));
        let url = format!("{}/flaky.ts", server.uri());

        let err = fetch_with_retry(&client, &url, &retry).await.unwrap_err();

        assert!(matches!(err, Error::Transport { attempts: 3, .. }));
        server.verify().await;
    }

    #[tokio::test]
    async fn test_limiter_gates_every_request() {
        let server = MockServer::start().await;
        serve(&server, "/index.m3u8", 200, "#EXTM3U").await;
        serve(&server, "/key.bin", 200, "0123456789abcdef").await;
        serve(&server, "/seg.ts", 200, "ts").await;

        let client = HttpClient::new(&NetworkConfig::default(), Some(2)).unwrap();
        let started = Instant::now();
        for route in ["/index.m3u8", "/key.bin", "/seg.ts", "/seg.ts"] {
            client.get(&format!("{}{}", server.uri(), route)).await.unwrap();
        }

        // Two requests fit the initial burst, the other two wait half a second each.
        assert!(started.elapsed() >= Duration::from_millis(900));
    }

    #[test]
    fn test_build_client() {
        let network = NetworkConfig {
            user_agent: Some("m3u8-downloader-test".to_string()),
            ..NetworkConfig::default()
        };

        let limited = HttpClient::new(&network, Some(20)).unwrap();
        assert!(limited.limiter.is_some());

        let unlimited = HttpClient::new(&network, None).unwrap();
        assert!(unlimited.limiter.is_none());

        let zero = HttpClient::new(&network, Some(0)).unwrap();
        assert!(zero.limiter.is_none());
    }
}
