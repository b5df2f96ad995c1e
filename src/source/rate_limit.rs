use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces out request starts by at least `min_interval`.
///
/// Callers queue on the mutex, so under contention requests are released one
/// interval apart in arrival order.
pub struct MinIntervalLimiter {
    min_interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl MinIntervalLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_start: Mutex::new(None),
        }
    }

    /// Wait until the caller may start its request.
    pub async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let mut last_start = self.last_start.lock().await;
        if let Some(prev) = *last_start {
            let ready_at = prev + self.min_interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last_start = Some(Instant::now());
    }
}
