//! Fixed-interval gate for sequential upstream calls.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Interval, MissedTickBehavior};

/// Five permits per second.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(200);

/// Releases one permit per `period`.
///
/// The first permit is immediate. Permits never accumulate: a caller that
/// was busy for several periods still waits a full period after its last
/// permit. Concurrent callers queue for permits in turn.
pub struct RateLimiter {
    interval: Mutex<Interval>,
}

impl RateLimiter {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval: Mutex::new(interval),
        }
    }

    /// Suspends until the next permit is available.
    pub async fn acquire(&self) {
        self.interval.lock().await.tick().await;
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD)
    }
}
