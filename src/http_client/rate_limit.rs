//! Request pacing for outbound HTTP calls.

use std::time::Duration;

use async_trait::async_trait;
use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};
use tokio::{sync::Mutex, time::Instant};

/// Enforces a minimum interval between requests.
///
/// Slots are handed out in call order; a caller that arrives while the limiter
/// is idle proceeds immediately.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter spacing requests at least `min_interval` apart.
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval, next_slot: Mutex::new(None) }
    }

    /// Creates a limiter allowing at most `requests_per_second` requests per
    /// second. `0` means unlimited.
    pub fn per_second(requests_per_second: u32) -> Self {
        if requests_per_second == 0 {
            Self::new(Duration::ZERO)
        } else {
            Self::new(Duration::from_secs(1) / requests_per_second)
        }
    }

    /// The enforced spacing.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until the caller may send its request.
    pub async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = next_slot.map_or(now, |next| next.max(now));
            *next_slot = Some(slot + self.min_interval);
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}

#[async_trait]
impl Middleware for RateLimiter {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        self.acquire().await;
        next.run(req, extensions).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_acquire_spaces_requests() {
        let limiter = RateLimiter::per_second(10);
        let start = Instant::now();

        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_limiter_does_not_wait() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        limiter.acquire().await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        let before = Instant::now();
        limiter.acquire().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_unlimited() {
        let limiter = RateLimiter::per_second(0);
        assert_eq!(limiter.min_interval(), Duration::ZERO);
        let start = std::time::Instant::now();
        for _ in 0..100 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
