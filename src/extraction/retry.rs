//! Retry policy for rate-limited model calls
//!
//! Only rate-limit failures are retried. The provider's retry-after hint wins
//! when present; otherwise the wait doubles from the base delay. Either way
//! the wait never exceeds the cap.

use crate::config::PipelineConfig;
use crate::providers::ExtractionError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Initial backoff when the provider gives no retry-after hint
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(30);

/// Upper bound on a computed backoff
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(180);

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub retry_on_rate_limit: bool,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_on_rate_limit: config.retry_on_429,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    /// Total attempts allowed, including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Exponential backoff for the given 1-based attempt that just failed
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Wait before retrying after `error` on `attempt`
    pub fn delay_for(&self, error: &ExtractionError, attempt: u32) -> Duration {
        error
            .retry_after()
            .map(|hint| hint.min(self.max_delay))
            .unwrap_or_else(|| self.backoff_delay(attempt))
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error
    /// or exhausts its attempts
    ///
    /// The last error is returned unchanged when attempts run out.
    pub async fn run<F, Fut, T>(&self, label: &str, mut operation: F) -> Result<T, ExtractionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExtractionError>>,
    {
        let mut attempt = 1;

        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !self.retry_on_rate_limit || !error.is_rate_limit() || attempt >= self.max_attempts() {
                return Err(error);
            }

            let delay = self.delay_for(&error, attempt);
            warn!(
                "{} rate limited (attempt {}/{}), retrying in {:?}",
                label,
                attempt,
                self.max_attempts(),
                delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
