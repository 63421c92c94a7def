//! Crate-level error type.
//!
//! The fetcher never raises to the worker and the worker never raises to the
//! orchestrator (a failed URL just drops out of the output); the only errors
//! that ever surface to a caller of [`crate::Crawler::crawl`] are programmer
//! errors at construction time and an external cancellation.

use thiserror::Error;

/// Errors observable by a caller of this crate.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The injected [`crate::CrawlerConfig`] violated one of its invariants.
    #[error("invalid crawler configuration: {0}")]
    ConfigInvalid(String),

    /// The crawl was unwound by an external cancellation signal before the
    /// frontier drained naturally. Partial results collected so far are still
    /// returned by the caller alongside this error.
    #[error("crawl cancelled before completion")]
    ExternalCancel,

    /// Building the shared HTTP client failed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, CrawlError>;
