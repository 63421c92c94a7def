//! Frontier & visited set (component F).
//!
//! The BFS queue and deduplication set, with depth and page-count gates.
//! Per the design notes, the "visited + admitted-count" pair is a single
//! mutual-exclusion region so `try_admit` is atomic — it is never
//! represented as independently locked fields.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{mpsc, Mutex};

struct FrontierState {
    visited: HashSet<String>,
    admitted: usize,
}

/// The BFS frontier: a concurrent queue with blocking receive, a
/// deduplicating visited set, and depth/page-count gates.
pub struct Frontier {
    state: Mutex<FrontierState>,
    sender: Mutex<Option<mpsc::UnboundedSender<(String, usize)>>>,
    receiver: Mutex<mpsc::UnboundedReceiver<(String, usize)>>,
    /// Count of admitted entries not yet passed to `mark_done`. Since every
    /// admission increments this and it only reaches zero once nothing is
    /// queued *and* nothing is being processed (processing is what produces
    /// further admissions), `outstanding == 0` is exactly the drain
    /// condition spec §4.7 step 4 describes — no separate queue-emptiness
    /// check is needed.
    outstanding: AtomicUsize,
    max_depth: usize,
    max_pages: usize,
}

impl Frontier {
    pub fn new(max_depth: usize, max_pages: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: Mutex::new(FrontierState {
                visited: HashSet::new(),
                admitted: 0,
            }),
            sender: Mutex::new(Some(tx)),
            receiver: Mutex::new(rx),
            outstanding: AtomicUsize::new(0),
            max_depth,
            max_pages,
        }
    }

    /// Atomically admit `url` at `depth`: true exactly when it is not
    /// already visited, `depth <= max_depth`, and the admitted count is
    /// still below `max_pages`.
    pub async fn try_admit(&self, url: String, depth: usize) -> bool {
        if depth > self.max_depth {
            return false;
        }

        let mut state = self.state.lock().await;
        if state.admitted >= self.max_pages {
            return false;
        }
        if !state.visited.insert(url.clone()) {
            return false;
        }

        let sender = self.sender.lock().await;
        match sender.as_ref() {
            Some(tx) => {
                state.admitted += 1;
                self.outstanding.fetch_add(1, Ordering::SeqCst);
                // An unbounded channel's send only fails if the receiver has
                // been dropped, which never happens while `self` is alive.
                let _ = tx.send((url, depth));
                true
            }
            None => {
                // Closed after we started; roll back the visited insertion.
                state.visited.remove(&url);
                false
            }
        }
    }

    /// Block until an entry is available, or the frontier is drained and
    /// closed (`None`).
    pub async fn next(&self) -> Option<(String, usize)> {
        let mut rx = self.receiver.lock().await;
        rx.recv().await
    }

    /// Must be called exactly once per item returned by `next`, regardless
    /// of outcome. Closes the frontier once the drain condition is reached.
    pub async fn mark_done(&self) {
        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.close().await;
        }
    }

    /// Stop accepting admissions. Already-queued entries are still
    /// delivered by `next`; once they are drained, `next` returns `None`.
    pub async fn close(&self) {
        let mut sender = self.sender.lock().await;
        *sender = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn admits_each_url_once() {
        let f = Frontier::new(10, 10);
        assert!(f.try_admit("http://h/a".into(), 0).await);
        assert!(!f.try_admit("http://h/a".into(), 0).await);
    }

    #[tokio::test]
    async fn respects_depth_gate() {
        let f = Frontier::new(1, 10);
        assert!(f.try_admit("http://h/a".into(), 1).await);
        assert!(!f.try_admit("http://h/b".into(), 2).await);
    }

    #[tokio::test]
    async fn respects_max_pages_gate() {
        let f = Frontier::new(10, 2);
        assert!(f.try_admit("http://h/a".into(), 0).await);
        assert!(f.try_admit("http://h/b".into(), 0).await);
        assert!(!f.try_admit("http://h/c".into(), 0).await);
    }

    #[tokio::test]
    async fn next_returns_none_after_drain_and_close() {
        let f = Arc::new(Frontier::new(10, 10));
        assert!(f.try_admit("http://h/a".into(), 0).await);

        let (url, depth) = f.next().await.unwrap();
        assert_eq!(url, "http://h/a");
        assert_eq!(depth, 0);

        f.mark_done().await; // outstanding hits 0 -> auto-closes
        assert!(f.next().await.is_none());
    }

    #[tokio::test]
    async fn admissions_during_processing_delay_closure() {
        let f = Arc::new(Frontier::new(10, 10));
        assert!(f.try_admit("http://h/a".into(), 0).await);

        let (url, _depth) = f.next().await.unwrap();
        assert_eq!(url, "http://h/a");

        // Simulate the worker admitting a child before finishing.
        assert!(f.try_admit("http://h/b".into(), 1).await);
        f.mark_done().await; // outstanding now 1 (the child), not closed yet

        let (child, depth) = f.next().await.unwrap();
        assert_eq!(child, "http://h/b");
        assert_eq!(depth, 1);
        f.mark_done().await;

        assert!(f.next().await.is_none());
    }

    #[tokio::test]
    async fn explicit_close_rejects_further_admissions() {
        let f = Frontier::new(10, 10);
        f.close().await;
        assert!(!f.try_admit("http://h/a".into(), 0).await);
        assert!(f.next().await.is_none());
    }
}
