//! Process-wide minimum delay between outbound requests.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Serializes requests so that consecutive sends are at least
/// `min_interval` apart. Clones share the same clock.
#[derive(Debug, Clone)]
pub(crate) struct Throttle {
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl Throttle {
    pub(crate) fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Waits until the next request may be sent and claims that slot.
    ///
    /// The lock is held across the sleep, so concurrent callers queue up
    /// behind each other.
    pub(crate) async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}
