//! Bounded exponential backoff for rate-limited requests.

use std::time::Duration;

use crate::error::UnitError;
use crate::fetch::{FetchOutcome, Fetcher};

/// Retry budget for a single fetch unit.
///
/// Only HTTP 429 responses are retried. The wait before a repeat attempt
/// is the server's `Retry-After` hint when it sent one, otherwise the
/// computed delay; the computed delay doubles after every rate-limited
/// attempt whether or not the hint was used.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total fetch attempts before the unit is abandoned.
    pub max_attempts: u32,
    /// Computed delay before the first repeat attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Wait before the repeat of attempt `attempt` (0-based): the hint if
    /// present, else `base_delay * 2^attempt`.
    pub fn next_delay(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        hint.unwrap_or_else(|| self.base_delay * 2u32.saturating_pow(attempt))
    }

    /// Whether another attempt is allowed after attempt `attempt` (0-based).
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }
}

/// Drive one logical fetch unit to resolution.
///
/// Performs at most `policy.max_attempts` fetches. Rate-limit waits happen
/// on the caller's own task, so a sleeping unit never stalls its siblings;
/// the unit keeps whatever concurrency slot it was given for the whole
/// loop, retries included.
pub async fn fetch_with_backoff(
    fetcher: &dyn Fetcher,
    policy: &RetryPolicy,
    url: &str,
) -> Result<String, UnitError> {
    for attempt in 0..policy.max_attempts {
        match fetcher.fetch(url).await {
            Ok(FetchOutcome::Success(body)) => return Ok(body),
            Ok(FetchOutcome::RateLimited { retry_after }) => {
                if !policy.should_retry(attempt) {
                    break;
                }
                let wait = policy.next_delay(attempt, retry_after);
                log::warn!(
                    "rate limited (attempt {}/{}), retrying in {wait:?}",
                    attempt + 1,
                    policy.max_attempts
                );
                tokio::time::sleep(wait).await;
            }
            Ok(FetchOutcome::Failed(status)) => return Err(UnitError::Status(status)),
            Err(e) => return Err(e.into()),
        }
    }
    Err(UnitError::RetriesExhausted)
}
