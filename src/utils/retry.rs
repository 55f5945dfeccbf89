//! Retry policy for store operations

use log::warn;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Retry policy with exponential backoff
///
/// Only transient errors (see [`crate::Error::is_transient`]) are retried.
/// The default performs no retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Backoff before the first retry (milliseconds)
    pub initial_backoff_ms: u64,

    /// Backoff ceiling (milliseconds)
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    /// Fail on the first error
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }

    /// Retry up to `max_retries` times, doubling from `initial_backoff_ms`
    pub const fn exponential(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff_ms,
            max_backoff_ms,
        }
    }

    /// Backoff before retry number `retry` (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry.saturating_sub(1)).unwrap_or(u64::MAX);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> crate::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = crate::Result<T>>,
    {
        let mut retry = 0;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && retry < self.max_retries => {
                    retry += 1;
                    let wait = self.backoff(retry);
                    warn!(
                        "{} failed ({}), retry {}/{} in {:?}",
                        what, e, retry, self.max_retries, wait
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Validate policy
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_retries > 0 && self.initial_backoff_ms > self.max_backoff_ms {
            return Err(crate::Error::Config(
                "Initial backoff must not exceed max backoff".to_string(),
            ));
        }

        Ok(())
    }
}
