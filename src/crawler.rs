//! Crawl orchestrator (component G).
//!
//! Drives the worker pool through the `init -> loading_robots -> running ->
//! draining -> done` lifecycle of spec §4.7. `draining` falls out of
//! [`crate::frontier::Frontier`]'s own bookkeeping (it self-closes once its
//! outstanding count reaches zero); the orchestrator's job is to seed the
//! frontier, spawn workers, and join every one of them before returning —
//! the termination guarantee spec §4.7 names explicitly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use reqwest::{redirect::Policy, Client};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::canonical::canonicalize;
use crate::config::CrawlerConfig;
use crate::error::CrawlError;
use crate::fetch::{FetchOutcome, Fetcher};
use crate::frontier::Frontier;
use crate::links::extract_links;
use crate::page::PageRecord;
use crate::rate_limit::RateLimiter;
use crate::robots::RobotsRules;
use crate::stats::CrawlStats;

/// Entry point for running a crawl against a validated [`CrawlerConfig`].
pub struct Crawler {
    config: CrawlerConfig,
    client: Client,
}

impl Crawler {
    /// Build the shared HTTP client (once, for the lifetime of the crawl)
    /// and construct the orchestrator. This is the `init` state of spec
    /// §4.7; the client is released when `crawl` returns.
    pub fn new(config: CrawlerConfig) -> Result<Self, CrawlError> {
        let base_host = host_of(&config.base_url);

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .redirect(Policy::custom(move |attempt| {
                if attempt.url().host_str().map(|h| h.to_ascii_lowercase()) == base_host {
                    attempt.follow()
                } else {
                    attempt.stop()
                }
            }))
            .build()?;

        Ok(Self { config, client })
    }

    /// Run a crawl to completion, with no external cancellation source.
    pub async fn crawl(&self) -> (Vec<PageRecord>, CrawlStats) {
        self.crawl_with_cancellation(CancellationToken::new())
            .await
            .expect("an unused cancellation token never fires ExternalCancel")
    }

    /// Run a crawl to completion, or until `cancel` fires. On cancellation
    /// the frontier stops admitting new work and workers exit as soon as
    /// their current fetch returns; partial results collected so far are
    /// still returned, alongside [`CrawlError::ExternalCancel`].
    pub async fn crawl_with_cancellation(
        &self,
        cancel: CancellationToken,
    ) -> Result<(Vec<PageRecord>, CrawlStats), CrawlError> {
        let start = Instant::now();
        info!(base_url = %self.config.base_url, "starting crawl");

        let robots = self.load_robots().await;

        let root = canonicalize(&self.config.base_url, None)
            .unwrap_or_else(|_| self.config.base_url.clone());

        let frontier = Arc::new(Frontier::new(self.config.max_depth, self.config.max_pages));
        frontier.try_admit(root, 0).await;

        let output = Arc::new(Mutex::new(Vec::new()));
        let stats = Arc::new(WorkerStats::default());
        let rate_limiter = Arc::new(RateLimiter::new(self.config.rate_limit));

        // A cancellation closes the frontier so every worker's next blocking
        // `next()` call unblocks with `None` and the pool winds down on its
        // own, preserving the single join point below.
        let closer = {
            let frontier = frontier.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                cancel.cancelled().await;
                frontier.close().await;
            })
        };

        let mut handles = Vec::with_capacity(self.config.concurrency);
        for _ in 0..self.config.concurrency {
            let frontier = frontier.clone();
            let output = output.clone();
            let stats = stats.clone();
            let robots = robots.clone();
            let client = self.client.clone();
            let config = self.config.clone();
            let rate_limiter = rate_limiter.clone();

            handles.push(tokio::spawn(worker_loop(
                config,
                client,
                robots,
                frontier,
                rate_limiter,
                output.clone(),
                stats,
            )));
        }

        for handle in handles {
            let _ = handle.await;
        }
        closer.abort();

        let results = match Arc::try_unwrap(output) {
            Ok(m) => m.into_inner(),
            Err(arc) => arc.lock().await.clone(),
        };

        let elapsed = start.elapsed();
        let final_stats = CrawlStats {
            pages_fetched: results.len(),
            robots_denied: stats.robots_denied.load(Ordering::Relaxed),
            errors: stats.errors.load(Ordering::Relaxed),
            elapsed,
        };

        info!(
            pages = final_stats.pages_fetched,
            robots_denied = final_stats.robots_denied,
            errors = final_stats.errors,
            elapsed_secs = elapsed.as_secs_f64(),
            "crawl finished"
        );

        if cancel.is_cancelled() {
            Err(CrawlError::ExternalCancel)
        } else {
            Ok((results, final_stats))
        }
    }

    async fn load_robots(&self) -> Arc<RobotsRules> {
        // robots.txt lives at the host root, not under the seed's path —
        // join against an absolute path so scheme/host/port are kept and
        // any path component of `base_url` is discarded.
        let robots_url = reqwest::Url::parse(&self.config.base_url)
            .and_then(|u| u.join("/robots.txt"))
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("{}/robots.txt", self.config.base_url.trim_end_matches('/')));

        match self.client.get(&robots_url).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(body) => {
                    info!(robots_url, "loaded robots.txt");
                    Arc::new(RobotsRules::parse(&body))
                }
                Err(err) => {
                    warn!(robots_url, error = %err, "failed to read robots.txt body, allowing all");
                    Arc::new(RobotsRules::allow_all())
                }
            },
            Ok(response) => {
                info!(robots_url, status = %response.status(), "no robots.txt, allowing all");
                Arc::new(RobotsRules::allow_all())
            }
            Err(err) => {
                warn!(robots_url, error = %err, "robots.txt unavailable, allowing all");
                Arc::new(RobotsRules::allow_all())
            }
        }
    }
}

#[derive(Default)]
struct WorkerStats {
    robots_denied: AtomicUsize,
    errors: AtomicUsize,
}

fn host_of(base_url: &str) -> Option<String> {
    reqwest::Url::parse(base_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
}

async fn worker_loop(
    config: CrawlerConfig,
    client: Client,
    robots: Arc<RobotsRules>,
    frontier: Arc<Frontier>,
    rate_limiter: Arc<RateLimiter>,
    output: Arc<Mutex<Vec<PageRecord>>>,
    stats: Arc<WorkerStats>,
) {
    let fetcher = Fetcher {
        client: &client,
        user_agent: &config.user_agent,
        retry_times: config.retry_times,
    };

    while let Some((url, depth)) = frontier.next().await {
        let outcome = fetcher.fetch(&url, &robots, &rate_limiter).await;

        match outcome {
            FetchOutcome::Fetched(record) => {
                if depth < config.max_depth {
                    if let Some(text) = record.content.as_text() {
                        let links = extract_links(text, &record.url);
                        for link in links {
                            frontier.try_admit(link, depth + 1).await;
                        }
                    }
                }

                let mut guard = output.lock().await;
                guard.push(record);
                if guard.len() % 50 == 0 {
                    info!(pages = guard.len(), "progress");
                }
            }
            FetchOutcome::Forbidden => {
                stats.robots_denied.fetch_add(1, Ordering::Relaxed);
            }
            FetchOutcome::Failed => {
                stats.errors.fetch_add(1, Ordering::Relaxed);
            }
        }

        frontier.mark_done().await;
    }
}
