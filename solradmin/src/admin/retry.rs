//! Bounded retry with a fixed sleep between attempts

use crate::config::RetryConfig;
use crate::error::{ClusterError, Result};
use crate::metrics;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy for transport failures.
///
/// Runs at most `1 + max_retries` attempts. Only errors for which
/// [`ClusterError::is_retryable`] holds are retried; anything else is
/// returned from the attempt that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_sleep: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, retry_sleep: Duration) -> Self {
        Self {
            max_retries,
            retry_sleep,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, config.retry_sleep())
    }

    /// Single attempt, no sleeping
    pub fn no_retry() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = None;
        let mut reached_server = false;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!(
                    operation = operation,
                    attempt = attempt + 1,
                    sleep_ms = self.retry_sleep.as_millis() as u64,
                    "Retrying admin request"
                );
                metrics::record_admin_retry(operation);
                tokio::time::sleep(self.retry_sleep).await;
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    warn!(
                        operation = operation,
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts(),
                        error = %e,
                        "Admin request failed"
                    );
                    reached_server |= e.may_have_reached_server();
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(ClusterError::RetriesExhausted {
            attempts: self.max_attempts(),
            last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
            reached_server,
        })
    }
}
