//! Debounced, latest-wins execution for search-as-you-type.
//!
//! Each call to [`SearchDebouncer::run`] takes a new ticket and waits for the
//! debounce delay. If another call arrives in the meantime, the earlier one
//! never fires. A request that did fire but was superseded while in flight
//! still completes at the transport level; its result is dropped.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct SearchDebouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Wait out the delay, then run `f` if no newer call arrived.
    ///
    /// Returns `None` when this call was superseded or invalidated, either
    /// before firing or while `f` was running.
    pub async fn run<F, Fut, T>(&self, f: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if !self.is_current(ticket) {
            trace!(ticket, "debounced call superseded before firing");
            return None;
        }

        let output = f().await;
        if !self.is_current(ticket) {
            trace!(ticket, "discarding stale result");
            return None;
        }
        Some(output)
    }

    /// Discard every pending and in-flight call.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test(start_paused = true)]
    async fn test_latest_call_wins() {
        let debouncer = SearchDebouncer::new(Duration::from_millis(300));
        let fired = Arc::new(AtomicUsize::new(0));

        let first = {
            let debouncer = debouncer.clone();
            let fired = fired.clone();
            tokio::spawn(async move {
                debouncer
                    .run(|| async move {
                        fired.fetch_add(1, Ordering::SeqCst);
                        "mar"
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        let fired_second = fired.clone();
        let second = debouncer
            .run(|| async move {
                fired_second.fetch_add(1, Ordering::SeqCst);
                "mario"
            })
            .await;

        assert_eq!(first.await.unwrap(), None);
        assert_eq!(second, Some("mario"));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_in_flight_result_is_discarded() {
        let debouncer = SearchDebouncer::new(Duration::from_millis(50));

        let slow = {
            let debouncer = debouncer.clone();
            tokio::spawn(async move {
                debouncer
                    .run(|| async {
                        tokio::time::sleep(Duration::from_secs(2)).await;
                        "old"
                    })
                    .await
            })
        };
        // Let the slow call fire and start its request.
        tokio::time::sleep(Duration::from_millis(60)).await;

        let fast = debouncer.run(|| async { "new" }).await;

        assert_eq!(fast, Some("new"));
        assert_eq!(slow.await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_cancels_pending_call() {
        let debouncer = SearchDebouncer::new(Duration::from_millis(300));

        let pending = {
            let debouncer = debouncer.clone();
            tokio::spawn(async move { debouncer.run(|| async { 1 }).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        debouncer.invalidate();

        assert_eq!(pending.await.unwrap(), None);
    }
}
