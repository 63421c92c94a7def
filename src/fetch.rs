//! Fetcher (component E).
//!
//! `fetch(url) -> FetchOutcome`, never raises to the worker. Handles robots
//! gating, rate-limit acquisition, content-type dispatch, and the
//! retry/back-off loop — spec §4.5.

use std::time::Duration;

use rand::Rng;
use reqwest::{Client, StatusCode};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::page::PageRecord;
use crate::rate_limit::RateLimiter;
use crate::robots::RobotsRules;

/// Result of one fetch attempt sequence for a single URL.
pub enum FetchOutcome {
    Fetched(PageRecord),
    /// Denied by robots.txt; never attempted.
    Forbidden,
    /// Timed out, 4xx other than 429, or the retry budget was exhausted.
    Failed,
}

pub struct Fetcher<'a> {
    pub client: &'a Client,
    pub user_agent: &'a str,
    pub retry_times: u32,
}

const MAX_BACKOFF_SECS: f64 = 60.0;

impl<'a> Fetcher<'a> {
    pub async fn fetch(
        &self,
        url: &str,
        rules: &RobotsRules,
        limiter: &RateLimiter,
    ) -> FetchOutcome {
        let path = reqwest::Url::parse(url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| "/".to_string());

        if !rules.allowed(self.user_agent, &path) {
            debug!(url, "robots denied");
            return FetchOutcome::Forbidden;
        }

        let crawl_delay = rules.crawl_delay(self.user_agent);
        let mut attempt: u32 = 1;

        loop {
            limiter.acquire(crawl_delay).await;

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::NOT_FOUND {
                        debug!(url, "404, not retrying");
                        return FetchOutcome::Failed;
                    }

                    if is_retryable_status(status) {
                        if attempt > self.retry_times {
                            warn!(url, %status, "giving up after {} attempts", attempt);
                            return FetchOutcome::Failed;
                        }
                        sleep(backoff(attempt)).await;
                        attempt += 1;
                        continue;
                    }

                    if status.is_success() {
                        return self.decode(url, response).await;
                    }

                    debug!(url, %status, "permanent non-retryable failure");
                    return FetchOutcome::Failed;
                }
                Err(err) if err.is_timeout() => {
                    debug!(url, "request timed out, not retrying");
                    return FetchOutcome::Failed;
                }
                Err(err) => {
                    if attempt > self.retry_times {
                        warn!(url, error = %err, "giving up after {} attempts", attempt);
                        return FetchOutcome::Failed;
                    }
                    debug!(url, error = %err, attempt, "transient transport error, retrying");
                    sleep(backoff(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn decode(&self, url: &str, response: reqwest::Response) -> FetchOutcome {
        let essence = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<mime::Mime>().ok())
            .map(|m| m.essence_str().to_ascii_lowercase())
            .unwrap_or_default();

        if essence.contains("html") || essence.contains("json") {
            match response.text().await {
                Ok(text) => FetchOutcome::Fetched(PageRecord::text(url, text)),
                Err(err) => {
                    warn!(url, error = %err, "failed to read response body as text");
                    FetchOutcome::Failed
                }
            }
        } else {
            match response.bytes().await {
                Ok(bytes) => FetchOutcome::Fetched(PageRecord::bytes(url, bytes.to_vec())),
                Err(err) => {
                    warn!(url, error = %err, "failed to read response body as bytes");
                    FetchOutcome::Failed
                }
            }
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// `min(60, 2^attempt)` seconds plus a small jitter, per spec §4.5.
fn backoff(attempt: u32) -> Duration {
    let base = 2f64.powi(attempt as i32).min(MAX_BACKOFF_SECS);
    let jitter: f64 = rand::thread_rng().gen_range(0.0..1.0);
    Duration::from_secs_f64((base + jitter).min(MAX_BACKOFF_SECS + 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::FORBIDDEN));
        assert!(!is_retryable_status(StatusCode::OK));
    }

    #[test]
    fn backoff_is_bounded() {
        for attempt in 1..10 {
            let d = backoff(attempt);
            assert!(d.as_secs_f64() <= MAX_BACKOFF_SECS + 1.0);
        }
    }
}
