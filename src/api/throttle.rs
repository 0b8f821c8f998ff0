//! Minimum-interval throttle shared by every outbound request
//!
//! The contest server rate-limits per credential, not per endpoint, so a
//! single `RateLimiter` paces all calls made through an `Endpoint`.

use log::debug;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Default spacing between two outbound requests
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Tracks when the last request went out and delays the next one if needed
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum time between the starts of two requests
    min_interval: Duration,
    /// Time of the last recorded request, `None` until the first one
    last_request: Mutex<Option<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Returns the configured minimum spacing
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Returns the time of the last recorded request, if any
    pub fn last_request(&self) -> Option<Instant> {
        *self.lock()
    }

    /// Waits until a request may be issued, then records the issue time
    ///
    /// The first call never waits. Later calls sleep for whatever remains of
    /// `min_interval` since the last recorded request. The recorded time is
    /// taken after the wait, when the request actually goes out.
    pub async fn throttle(&self) {
        if let Some(wait) = self.remaining(Instant::now()) {
            debug!("Throttling next request for {:?}", wait);
            sleep(wait).await;
        }
        self.record();
    }

    /// Records "now" as the last request time
    ///
    /// Called again when a response arrives so that spacing is measured from
    /// the end of a slow request.
    pub fn record(&self) {
        *self.lock() = Some(Instant::now());
    }

    /// Time left before the next request is allowed at `now`
    fn remaining(&self, now: Instant) -> Option<Duration> {
        let last = (*self.lock())?;
        let ready_at = last + self.min_interval;
        (ready_at > now).then(|| ready_at - now)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        self.last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_interval_is_one_second() {
        let limiter = RateLimiter::default();
        assert_eq!(limiter.min_interval(), Duration::from_secs(1));
        assert!(limiter.last_request().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_call_does_not_wait() {
        let limiter = RateLimiter::default();
        let start = Instant::now();

        limiter.throttle().await;

        assert_eq!(Instant::now() - start, Duration::ZERO);
        assert!(limiter.last_request().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_to_back_calls_are_spaced() {
        let limiter = RateLimiter::default();

        limiter.throttle().await;
        let first = Instant::now();
        limiter.throttle().await;
        let second = Instant::now();

        assert!(second - first >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_wait_after_elapsed_time() {
        let limiter = RateLimiter::default();
        limiter.throttle().await;
        tokio::time::advance(Duration::from_millis(600)).await;

        let before = Instant::now();
        limiter.throttle().await;
        let waited = Instant::now() - before;

        assert!(waited >= Duration::from_millis(400));
        assert!(waited < Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_once_interval_has_passed() {
        let limiter = RateLimiter::default();
        limiter.throttle().await;
        tokio::time::advance(Duration::from_secs(2)).await;

        let before = Instant::now();
        limiter.throttle().await;

        assert_eq!(Instant::now() - before, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_pushes_next_window() {
        let limiter = RateLimiter::default();
        limiter.throttle().await;
        tokio::time::advance(Duration::from_millis(900)).await;
        limiter.record();

        let before = Instant::now();
        limiter.throttle().await;

        assert!(Instant::now() - before >= Duration::from_secs(1));
    }
}
