use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Enforces a minimum gap between the *start* of consecutive requests.
///
/// The lock is held across the sleep, so waiters are admitted one at a time
/// and each one measures its gap from the previous admission.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_start: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Suspends until a request may start, then records the start time.
    pub async fn wait(&self) {
        let mut last = self.last_start.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let delay = self.min_interval - elapsed;
                debug!(delay_ms = delay.as_millis() as u64, "pacing sp-api request");
                tokio::time::sleep(delay).await;
            }
        }
        *last = Some(Instant::now());
    }
}
