//! Summary statistics returned alongside the fetched page list.

use std::time::Duration;

/// Counters accumulated over a single crawl, returned next to the
/// [`crate::PageRecord`] list so a caller gets the "(PageRecord list,
/// statistics)" pair without having to derive them from the output itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Number of URLs successfully fetched and present in the output.
    pub pages_fetched: usize,
    /// Number of URLs skipped because robots.txt denied them.
    pub robots_denied: usize,
    /// Number of URLs that exhausted their retry budget or hit a permanent
    /// failure (4xx other than 429, or timeout).
    pub errors: usize,
    /// Wall-clock duration of the crawl.
    pub elapsed: Duration,
}
