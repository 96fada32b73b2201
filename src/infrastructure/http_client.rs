//! HTTP client for wiki scraping with rate limiting and error handling
//!
//! Wraps reqwest with a token-bucket rate limiter and cancellation
//! support so concurrent workers stay within a polite request budget.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::InMemoryState;
use governor::state::direct::NotKeyed;
use governor::{Quota, RateLimiter};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Response};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::services::PageFetcher;
use crate::infrastructure::parsing::ScrapeError;

/// HTTP client configuration for scraping
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"
                .to_string(),
            timeout_seconds: 30,
            max_requests_per_second: 5,
        }
    }
}

/// Rate-limited HTTP client for respectful scraping
pub struct HttpClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    cancellation: CancellationToken,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration.
    pub fn new(config: HttpClientConfig, cancellation: CancellationToken) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("invalid user agent")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("failed to create HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .context("rate limit must be greater than 0")?,
        );

        Ok(Self {
            client,
            rate_limiter: RateLimiter::direct(quota),
            cancellation,
        })
    }

    /// Fetch a URL, waiting on the rate limiter first.
    ///
    /// Returns [`ScrapeError::Cancelled`] once the run has been aborted.
    pub async fn get(&self, url: &str) -> Result<Response> {
        tokio::select! {
            _ = self.cancellation.cancelled() => return Err(ScrapeError::Cancelled.into()),
            _ = self.rate_limiter.until_ready() => {}
        }

        debug!(url, "fetching");

        let response = tokio::select! {
            _ = self.cancellation.cancelled() => return Err(ScrapeError::Cancelled.into()),
            result = self.client.get(url).send() => result.map_err(|source| ScrapeError::Transport {
                url: url.to_string(),
                source,
            })?,
        };

        if !response.status().is_success() {
            return Err(ScrapeError::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            }
            .into());
        }

        Ok(response)
    }

    /// Fetch a URL and return the body as text.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.get(url).await?;
        response
            .text()
            .await
            .with_context(|| format!("failed to read response body from: {url}"))
    }

    /// Fetch a URL and return the raw body bytes.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get(url).await?;
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("failed to read response body from: {url}"))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        self.get_text(url).await
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.get_bytes(url).await
    }
}
