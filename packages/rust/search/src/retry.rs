//! Bounded retry with exponential backoff for provider calls.

use std::future::Future;
use std::time::Duration;

use mapsweep_shared::{ExploreConfig, Result};
use tracing::warn;

use crate::throttle::RateLimiter;

/// Largest backoff exponent; keeps `base * 2^n` from overflowing.
const MAX_BACKOFF_EXPONENT: u32 = 10;

/// Result of a retried call plus how many attempts it took.
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T>,
    pub attempts: u32,
}

/// How often and how patiently a failed call is retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles each time.
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_backoff: Duration) -> Self {
        Self {
            max_retries,
            base_backoff,
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff * (1u32 << attempt.min(MAX_BACKOFF_EXPONENT))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// exhausts `max_retries`. Every attempt first waits on `limiter`.
    pub async fn run<T, F, Fut>(&self, limiter: &RateLimiter, label: &str, mut op: F) -> Attempted<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            limiter.acquire().await;
            match op().await {
                Ok(value) => {
                    return Attempted {
                        result: Ok(value),
                        attempts: attempt + 1,
                    };
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.backoff(attempt);
                    warn!(target_call = label, attempt, error = %e, ?delay, "call failed; retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Attempted {
                        result: Err(e),
                        attempts: attempt + 1,
                    };
                }
            }
        }
    }
}

impl From<&ExploreConfig> for RetryPolicy {
    fn from(config: &ExploreConfig) -> Self {
        Self::new(config.max_retries, config.retry_backoff())
    }
}
