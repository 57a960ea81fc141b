//! HTTP GET/POST with exponential backoff on rate limits and transient failures.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::NetworkConfig;
use crate::error::{ConfigError, FetchError, FetchErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts in total, including the first one.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Sleep before the retry that follows failed attempt `attempt` (from 0):
    /// `base_delay * 2^attempt`, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl From<&NetworkConfig> for RetryPolicy {
    fn from(network: &NetworkConfig) -> Self {
        Self {
            max_retries: network.max_retries,
            base_delay: network.base_delay(),
            max_delay: network.max_delay(),
        }
    }
}

/// Shared HTTP client plus retry policy.
///
/// Cloning is cheap and every clone reuses the same connection pool.
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
    retry: RetryPolicy,
}

impl FetchClient {
    pub fn new(network: &NetworkConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .user_agent(network.user_agent.clone())
            .timeout(network.timeout())
            .build()?;
        Ok(Self::with_client(client, RetryPolicy::from(network)))
    }

    pub fn with_client(client: Client, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// GET `url`, retrying on 429, 5xx and transport failures.
    pub async fn fetch_with_retry(&self, url: &str) -> Result<Response, FetchError> {
        self.execute(url, || {
            self.client
                .get(url)
                .header("Accept", "application/json")
        })
        .await
    }

    pub async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let response = self.fetch_with_retry(url).await?;
        decode(response).await
    }

    pub async fn post_json(&self, url: &str, body: &Value) -> Result<Value, FetchError> {
        let response = self
            .execute(url, || self.client.post(url).json(body))
            .await?;
        decode(response).await
    }

    async fn execute<F>(&self, url: &str, build: F) -> Result<Response, FetchError>
    where
        F: Fn() -> RequestBuilder,
    {
        let attempts = self.retry.max_retries.max(1);
        let mut last_error = FetchError::new(FetchErrorKind::NetworkError);

        for attempt in 0..attempts {
            debug!("Requesting {} (attempt {}/{})", url, attempt + 1, attempts);

            match build().send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let error = FetchError::from_status(response.status());
                    if !error.kind.is_retryable() {
                        debug!("{} returned {}, not retrying", url, error);
                        return Err(error);
                    }
                    last_error = error;
                }
                Err(e) => {
                    debug!("Request to {} failed: {}", url, e);
                    last_error = FetchError::from_transport(&e);
                    if !last_error.kind.is_retryable() {
                        return Err(last_error);
                    }
                }
            }

            if attempt + 1 < attempts {
                let delay = self.retry.delay_for(attempt);
                warn!(
                    "{} from {}; retrying in {:?} ({}/{})",
                    last_error,
                    url,
                    delay,
                    attempt + 1,
                    attempts - 1
                );
                tokio::time::sleep(delay).await;
            }
        }

        warn!("Giving up on {} after {} attempts: {}", url, attempts, last_error);
        Err(last_error)
    }
}

async fn decode(response: Response) -> Result<Value, FetchError> {
    let status = response.status().as_u16();
    response.json::<Value>().await.map_err(|e| {
        debug!("Undecodable body (HTTP {}): {}", status, e);
        FetchError {
            kind: FetchErrorKind::InvalidResponse,
            last_status: Some(status),
        }
    })
}
