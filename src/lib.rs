//! `site_scout` crawls a single host breadth-first, honoring robots.txt,
//! a global rate limit, and per-request retry/back-off, producing a
//! deduplicated collection of fetched page records for downstream
//! aggregation.
//!
//! The crate is a pure function of `(config, network responses)` producing
//! `(page list, statistics)` — it has no CLI, no config-file loader, and no
//! report renderer of its own; those are expected to live in a collaborator
//! built on top of this engine.
//!
//! ```no_run
//! # async fn run() -> site_scout::Result<()> {
//! use site_scout::{Crawler, CrawlerBuilder};
//!
//! let config = CrawlerBuilder::new("https://example.com")
//!     .with_max_depth(3)
//!     .with_rate_limit(2.0)
//!     .build()?;
//! let crawler = Crawler::new(config)?;
//! let (pages, stats) = crawler.crawl().await;
//! println!("fetched {} pages ({} robots-denied)", pages.len(), stats.robots_denied);
//! # let _ = pages;
//! # Ok(())
//! # }
//! ```

mod canonical;
mod config;
mod crawler;
mod error;
mod fetch;
mod frontier;
mod links;
mod page;
mod rate_limit;
mod robots;
mod stats;

pub use canonical::{canonicalize, CanonicalizeError};
pub use config::{CrawlerBuilder, CrawlerConfig};
pub use crawler::Crawler;
pub use error::{CrawlError, Result};
pub use page::{PageContent, PageRecord};
pub use robots::RobotsRules;
pub use stats::CrawlStats;
