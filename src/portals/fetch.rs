//! HTTP page fetch with exponential backoff and jitter.
//!
//! This is one of the two layers that retry (the other is the AI call).
//! Adapters above it never retry on their own.

use std::time::Duration;

use metrics::counter;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

use crate::retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: &'static str },

    #[error("transport error: {0}")]
    Other(String),
}

impl FetchError {
    /// Connection, timeout, 5xx and 429 are worth another attempt; other 4xx are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Connect(_) | FetchError::Timeout(_) => true,
            FetchError::Status { status, .. } => *status >= 500 || *status == 429,
            FetchError::Other(_) => false,
        }
    }

    pub fn from_status(status: StatusCode) -> Self {
        FetchError::Status {
            status: status.as_u16(),
            message: status_message(status.as_u16()),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else if err.is_connect() || err.is_request() || err.is_body() {
            FetchError::Connect(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::from_status(status)
        } else {
            FetchError::Other(err.to_string())
        }
    }
}

/// Human-readable hint for the status codes portals actually return.
pub fn status_message(status: u16) -> &'static str {
    match status {
        400 => "bad request",
        401 => "unauthorized, authentication required",
        403 => "forbidden, possibly blocked",
        404 => "page not found",
        429 => "too many requests, consider a longer delay",
        500 => "internal server error",
        502 => "bad gateway",
        503 => "service temporarily unavailable",
        504 => "gateway timeout",
        s if s >= 500 => "server error",
        _ => "unexpected status",
    }
}

/// Source of page bodies. The HTTP implementation retries; test doubles do not need to.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration, policy: RetryPolicy) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("es-AR,es;q=0.9,en;q=0.8"),
        );
        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(5).min(timeout))
            .timeout(timeout)
            .build()?;
        Ok(Self { client, policy })
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status));
        }
        Ok(resp.text().await?)
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        with_retry(&self.policy, url, || self.fetch_once(url)).await
    }
}

/// Drive `op` under `policy`, retrying only errors that say they are retryable.
pub async fn with_retry<F, Fut>(policy: &RetryPolicy, url: &str, mut op: F) -> Result<String, FetchError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<String, FetchError>>,
{
    let attempts = policy.attempts();
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(body) => return Ok(body),
            Err(e) if e.is_retryable() && attempt < attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    url,
                    attempt,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "fetch failed, retrying"
                );
                counter!("fetch_retries_total").increment(1);
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                debug!(url, attempt, error = %e, "fetch gave up");
                return Err(e);
            }
        }
    }
}
