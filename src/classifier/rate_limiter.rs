// Request pacing for rate-limited classifier backends.
//
// Perspective's free tier allows one query per second. Callers reserve the
// next free slot under a short lock and then sleep outside it, so concurrent
// fan-outs queue up in arrival order without holding the mutex while idle.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Enforces a minimum spacing between requests. Cheap to clone.
#[derive(Clone)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    /// Allow at most `requests_per_second` requests per second.
    pub fn new(requests_per_second: f64) -> Self {
        Self {
            interval: Duration::from_secs_f64(1.0 / requests_per_second),
            next_slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Wait for this caller's slot.
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next = Some(slot + self.interval);
            slot
        };

        tokio::time::sleep_until(slot).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_request_is_immediate() {
        let limiter = RateLimiter::new(1.0);
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn second_request_waits_for_interval() {
        let limiter = RateLimiter::new(4.0); // 250ms spacing
        limiter.acquire().await;
        let start = Instant::now();
        limiter.acquire().await;
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(200),
            "Expected ~250ms delay, got {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn concurrent_callers_are_spaced_out() {
        let limiter = RateLimiter::new(10.0); // 100ms spacing
        let start = Instant::now();
        let (a, b, c) = tokio::join!(limiter.acquire(), limiter.acquire(), limiter.acquire());
        let _ = (a, b, c);
        assert!(start.elapsed() >= Duration::from_millis(180));
    }
}
