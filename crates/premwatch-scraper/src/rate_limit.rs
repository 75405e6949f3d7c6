//! Process-wide outbound request gate.
//!
//! Every fetch and every AI call reserves the next free slot on a single
//! shared timeline spaced by the configured inter-request delay. Workers hold
//! the lock only to reserve a slot and sleep outside it, so a slow sleeper
//! never blocks others from queueing.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

pub type SharedRateLimiter = Arc<RateLimiter>;

impl RateLimiter {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn shared(interval: Duration) -> SharedRateLimiter {
        Arc::new(Self::new(interval))
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until this caller's slot opens.
    pub async fn acquire(&self) {
        let wait = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = next.map_or(now, |n| n.max(now));
            *next = Some(slot + self.interval);
            slot.saturating_duration_since(now)
        };

        if !wait.is_zero() {
            tracing::trace!(wait_ms = wait.as_millis(), "rate limiter delaying request");
            tokio::time::sleep(wait).await;
        }
    }
}
