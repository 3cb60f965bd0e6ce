//! Fixed-delay retry for outbound requests.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::NetworkConfig;
use crate::download::client::Fetch;
use crate::error::{Error, Result};

/// How often and how patiently a request is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Pause between two attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    pub fn from_network(network: &NetworkConfig) -> Self {
        Self::new(network.max_attempts, network.retry_delay())
    }

    /// Attempts actually made; a policy always makes at least one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Run `operation` until it succeeds or the policy is exhausted.
///
/// The closure receives the 1-based attempt number. The last error is returned.
pub async fn retry<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => return Err(e),
            Err(e) => {
                warn!(
                    attempt,
                    max = attempts,
                    delay_ms = policy.delay.as_millis() as u64,
                    error = %e,
                    "Retrying after failed attempt"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}

/// GET `url` under `policy`, reporting exhaustion as [`Error::Transport`].
pub async fn fetch_with_retry(
    fetcher: &dyn Fetch,
    url: &str,
    policy: &RetryPolicy,
) -> Result<Vec<u8>> {
    retry(policy, |_| fetcher.get(url))
        .await
        .map_err(|e| Error::Transport {
            url: url.to_string(),
            attempts: policy.attempts(),
            message: e.to_string(),
        })
}
