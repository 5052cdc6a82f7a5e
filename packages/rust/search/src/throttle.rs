//! Global minimum-interval throttle for collaborator calls.

use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota};

/// Spaces calls at least `min_interval` apart across all workers.
///
/// Backed by a single-cell `governor` quota, so there is no burst: each
/// permit becomes available one period after the previous one.
pub struct RateLimiter {
    limiter: Option<DefaultDirectRateLimiter>,
}

impl RateLimiter {
    /// A zero interval disables throttling.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            limiter: Quota::with_period(min_interval).map(DefaultDirectRateLimiter::direct),
        }
    }

    /// A limiter that never waits.
    pub fn unlimited() -> Self {
        Self { limiter: None }
    }

    pub fn is_limited(&self) -> bool {
        self.limiter.is_some()
    }

    /// Wait until the next call is allowed.
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn spaces_consecutive_calls() {
        let limiter = RateLimiter::new(Duration::from_millis(20));
        assert!(limiter.is_limited());
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        // First call is free, the next two wait one interval each.
        assert!(start.elapsed() >= Duration::from_millis(35));
    }

    #[tokio::test]
    async fn zero_interval_never_waits() {
        let limiter = RateLimiter::new(Duration::ZERO);
        assert!(!limiter.is_limited());
        let start = Instant::now();
        for _ in 0..100 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn shared_across_tasks() {
        let limiter = std::sync::Arc::new(RateLimiter::new(Duration::from_millis(15)));
        let start = Instant::now();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.acquire().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
