//! Input-rate limiter for type-ahead searches.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Collapses bursts of input: of several calls to [`Debouncer::settle`]
/// made within `delay` of each other, only the last yields its value.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    latest: Arc<AtomicU64>,
}

impl Debouncer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    #[must_use]
    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait out the quiet window. Returns `Some(value)` if no newer input
    /// arrived in the meantime, `None` if this input was superseded.
    pub async fn settle<T>(&self, value: T) -> Option<T> {
        let mine = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        (self.latest.load(Ordering::SeqCst) == mine).then_some(value)
    }
}
