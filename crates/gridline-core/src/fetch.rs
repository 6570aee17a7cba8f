//! HTTP GET with rate-limit classification.
//!
//! The fetcher resolves every request into one of three outcomes: a
//! successful body, a rate-limit signal (with the server's suggested wait,
//! when it sends one), or a terminal status failure. Transport errors
//! surface as a distinct `Err` so the fan-out layer can count them toward
//! batch completion instead of losing the unit.

use std::time::Duration;

use async_trait::async_trait;

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Classified result of a single HTTP GET.
#[derive(Debug)]
pub enum FetchOutcome {
    /// HTTP 200 with the raw response body.
    Success(String),
    /// HTTP 429; `retry_after` carries the `Retry-After` header when present.
    RateLimited { retry_after: Option<Duration> },
    /// Any other status. Logged by the caller, never retried.
    Failed(u16),
}

/// Transport-level failure (DNS, connect, TLS, broken body read).
#[derive(Debug)]
pub struct FetchError {
    message: String,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build from a reqwest error, stripping the URL to avoid leaking
    /// query parameters into logs.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        Self {
            message: e.without_url().to_string(),
        }
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "transport error: {}", self.message)
    }
}

impl std::error::Error for FetchError {}

/// One HTTP GET, classified. Injected into the pipeline so tests can
/// substitute scripted responses.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchOutcome, FetchError>;
}

/// Production fetcher over a pooled reqwest client.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(8)
            .build()
            .map_err(FetchError::from_reqwest)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutcome, FetchError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        match response.status().as_u16() {
            200 => {
                let body = response.text().await.map_err(FetchError::from_reqwest)?;
                Ok(FetchOutcome::Success(body))
            }
            429 => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_retry_after);
                Ok(FetchOutcome::RateLimited { retry_after })
            }
            status => Ok(FetchOutcome::Failed(status)),
        }
    }
}

/// `Retry-After` carries an integer number of milliseconds per the
/// telemetry API contract. Non-numeric values count as "no hint".
fn parse_retry_after(raw: &str) -> Option<Duration> {
    raw.trim().parse::<u64>().ok().map(Duration::from_millis)
}
