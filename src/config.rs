//! Configuration and the `CrawlerBuilder` that validates it.
//!
//! spec §6 treats configuration as "opaque to the core... all paths and URLs
//! arrive pre-validated", with `ConfigInvalid` "produced by the collaborator,
//! never by the core" (§7). This builder is that collaborator boundary: it is
//! the one place the core is allowed to reject bad input before a crawl ever
//! starts, mirroring the teacher's `CrawlerBuilder`.

use std::time::Duration;

use url::Url;

use crate::error::CrawlError;

#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub(crate) base_url: String,
    pub(crate) user_agent: String,
    pub(crate) max_depth: usize,
    pub(crate) max_pages: usize,
    pub(crate) timeout: Duration,
    pub(crate) rate_limit: f64,
    pub(crate) retry_times: u32,
    pub(crate) concurrency: usize,
}

const DEFAULT_USER_AGENT: &str = "SiteScout/1.0";
const DEFAULT_MAX_DEPTH: usize = 5;
const DEFAULT_MAX_PAGES: usize = 1000;
const DEFAULT_TIMEOUT_SECS: f64 = 10.0;
const DEFAULT_RATE_LIMIT: f64 = 2.0;
const DEFAULT_RETRY_TIMES: u32 = 2;

/// Builder for [`CrawlerConfig`]. Every setter is infallible; validation
/// happens once, in [`CrawlerBuilder::build`].
pub struct CrawlerBuilder {
    base_url: Option<String>,
    user_agent: String,
    max_depth: usize,
    max_pages: usize,
    timeout: Duration,
    rate_limit: f64,
    retry_times: u32,
    concurrency: Option<usize>,
}

impl Default for CrawlerBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_pages: DEFAULT_MAX_PAGES,
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
            rate_limit: DEFAULT_RATE_LIMIT,
            retry_times: DEFAULT_RETRY_TIMES,
            concurrency: None,
        }
    }
}

impl CrawlerBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::default()
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: f64) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_retry_times(mut self, retry_times: u32) -> Self {
        self.retry_times = retry_times;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn build(self) -> Result<CrawlerConfig, CrawlError> {
        let base_url = self
            .base_url
            .ok_or_else(|| CrawlError::ConfigInvalid("base_url is required".into()))?;

        let parsed = Url::parse(&base_url)
            .map_err(|e| CrawlError::ConfigInvalid(format!("base_url is not a valid URL: {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(CrawlError::ConfigInvalid(
                "base_url must be an absolute http(s) URL".into(),
            ));
        }

        if self.user_agent.trim().is_empty() {
            return Err(CrawlError::ConfigInvalid("user_agent must not be empty".into()));
        }
        if self.max_pages == 0 {
            return Err(CrawlError::ConfigInvalid("max_pages must be positive".into()));
        }
        if self.timeout.is_zero() {
            return Err(CrawlError::ConfigInvalid("timeout must be positive".into()));
        }
        if self.rate_limit <= 0.0 {
            return Err(CrawlError::ConfigInvalid("rate_limit must be positive".into()));
        }

        let concurrency = self
            .concurrency
            .unwrap_or_else(|| (self.rate_limit.ceil() as usize).max(1));
        if concurrency == 0 {
            return Err(CrawlError::ConfigInvalid("concurrency must be positive".into()));
        }

        Ok(CrawlerConfig {
            base_url,
            user_agent: self.user_agent,
            max_depth: self.max_depth,
            max_pages: self.max_pages,
            timeout: self.timeout,
            rate_limit: self.rate_limit,
            retry_times: self.retry_times,
            concurrency,
        })
    }
}
