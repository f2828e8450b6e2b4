//! Shared HTTP client with rate limiting and bounded timeouts
//!
//! One configured reqwest client serves both external collaborators. The
//! client-side rate limiter keeps bulk runs from hammering either service;
//! every request carries the configured timeout so a dead upstream shows up
//! as a failure, not a hang.

use anyhow::{Context, Result};
use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Response};
use serde::Serialize;
use std::num::NonZeroU32;
use std::time::Duration;

/// HTTP client configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub timeout_ms: u64,
    pub max_requests_per_second: u32,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("relist/{}", env!("CARGO_PKG_VERSION")),
            timeout_ms: 30_000,
            max_requests_per_second: 5,
        }
    }
}

/// Rate-limited reqwest wrapper shared by the API adapters
pub struct HttpClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("invalid user agent")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .default_headers(headers)
            .build()
            .context("failed to build HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .context("rate limit must be greater than 0")?,
        );

        Ok(Self { client, rate_limiter: RateLimiter::direct(quota) })
    }

    /// POST a JSON body; rate-limited, not yet status-checked
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> std::result::Result<Response, reqwest::Error> {
        self.rate_limiter.until_ready().await;
        self.client.post(url).json(body).send().await
    }

    /// GET an event-stream response; rate-limited. No overall timeout is
    /// applied here: the connection is long-lived by design and its
    /// lifetime is governed by the consumer's cancellation handle.
    pub async fn get_event_stream(
        &self,
        url: &str,
    ) -> std::result::Result<Response, reqwest::Error> {
        self.rate_limiter.until_ready().await;
        self.client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .timeout(Duration::from_secs(24 * 60 * 60))
            .send()
            .await
    }
}
