//! Request pacing for the upstream site
//!
//! A single worker only ever talks to Steam, so pacing is one global minimum
//! interval between requests rather than per-domain bookkeeping.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum delay between consecutive upstream requests
pub struct Pacer {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Waits until a request may be sent, then records it as sent
    pub async fn wait(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let remaining = self.min_interval - elapsed;
                tracing::trace!("Pacing: waiting {:?} before next request", remaining);
                tokio::time::sleep(remaining).await;
            }
        }
        *last = Some(Instant::now());
    }
}
