//! Process-wide rate limiter for language model calls
//!
//! One limiter instance is shared by every entity in flight. It guarantees:
//! - at most one scheduled task runs at a time
//! - tasks start in the order they were scheduled
//! - two task starts are never closer together than the minimum interval
//!
//! Ordering comes from `tokio::sync::Mutex`, which hands the lock out in FIFO
//! order. The guard is held for the whole task so dispatch decisions and
//! execution are serialized together.

use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Serializes and spaces out asynchronous tasks
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum time between two task starts
    min_interval: Duration,

    /// When the previous task was dispatched
    last_dispatch: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter with an explicit spacing interval
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_dispatch: Mutex::new(None),
        }
    }

    /// Creates a limiter that allows `requests_per_minute` task starts per minute
    ///
    /// The spacing is `60000 / rpm` milliseconds, rounded up. A zero rate is
    /// treated as one request per minute.
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let rpm = u64::from(requests_per_minute.max(1));
        let spacing_ms = 60_000u64.div_ceil(rpm);
        Self::new(Duration::from_millis(spacing_ms))
    }

    /// Returns the enforced spacing between task starts
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Runs `task` once every task scheduled before it has started and finished
    /// and the spacing interval since the previous start has elapsed
    ///
    /// The task's output, including any error it returns, is passed through
    /// unchanged.
    pub async fn schedule<F, Fut, T>(&self, task: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut last_dispatch = self.last_dispatch.lock().await;

        if let Some(previous) = *last_dispatch {
            let ready_at = previous + self.min_interval;
            if ready_at > Instant::now() {
                tracing::debug!(
                    "Rate limiter holding task for {:?}",
                    ready_at - Instant::now()
                );
                sleep_until(ready_at).await;
            }
        }

        *last_dispatch = Some(Instant::now());
        task().await
    }
}
