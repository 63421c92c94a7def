//! Rate limiter (component D).
//!
//! A single process-wide gate enforcing an average ceiling of `rate_limit`
//! requests per second, using the "reservation slot" strategy of spec §4.4:
//! the next permitted timestamp is computed and written back to the guarded
//! state *before* the lock is released, so concurrent workers never read the
//! same `last_ts` and race past each other.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

pub struct RateLimiter {
    rate_limit: f64,
    /// `None` until the first `acquire`, so the first request is never
    /// throttled — matches the original's `_last_request_ts = 0.0` sentinel.
    state: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(rate_limit: f64) -> Self {
        Self {
            rate_limit,
            state: Mutex::new(None),
        }
    }

    /// Block until issuing a request now would keep the last-second request
    /// count within `rate_limit`. When `crawl_delay` is known, the minimum
    /// inter-request interval becomes `max(1/rate_limit, crawl_delay)`.
    pub async fn acquire(&self, crawl_delay: Option<f64>) {
        let min_interval = (1.0 / self.rate_limit).max(crawl_delay.unwrap_or(0.0));
        let min_interval = Duration::from_secs_f64(min_interval.max(0.0));

        let wake_at = {
            let mut last_ts = self.state.lock().await;
            let now = Instant::now();
            let next = match *last_ts {
                Some(last) => (last + min_interval).max(now),
                None => now,
            };
            *last_ts = Some(next);
            next
        };

        sleep_until(wake_at).await;
    }
}
