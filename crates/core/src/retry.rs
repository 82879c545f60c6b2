//! Retry mechanism with exponential backoff
//!
//! Every failure is retried: a unit of work gets a fixed number of attempts
//! and the delay before attempt `k` is `backoff_base_ms^k` milliseconds.
//! With the defaults that is no delay, then 100ms, then 10s.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Retry policy for a single unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Base of the exponential backoff, in milliseconds
    pub backoff_base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 100,
        }
    }
}

impl RetryPolicy {
    /// Delay before the zero-based `attempt`
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.backoff_base_ms.saturating_pow(attempt))
    }
}

/// Run `operation` under `policy`, retrying on any error
///
/// `operation` receives the zero-based attempt index. `on_failure` sees every
/// failed attempt, including the last. Cancellation is checked before each
/// attempt and interrupts backoff sleeps.
///
/// # Example
/// ```ignore
/// let bytes = retry_with_backoff(
///     &RetryPolicy::default(),
///     &cancel,
///     "backup.zip",
///     |_attempt| async { backend.get_bytes("backup.zip").await },
///     |attempt, e| tracing::warn!(attempt, error = %e, "retrying"),
/// ).await?;
/// ```
pub async fn retry_with_backoff<T, F, Fut, O>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    name: &str,
    mut operation: F,
    mut on_failure: O,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
    O: FnMut(u32, &Error),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 0..max_attempts {
        let delay = policy.backoff(attempt);
        if !delay.is_zero() {
            tracing::debug!(attempt, backoff_ms = delay.as_millis() as u64, name, "Backing off");
            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                on_failure(attempt, &e);
                last_error = Some(e);
            }
        }
    }

    let last = last_error.unwrap_or_else(|| Error::Internal("retry loop made no attempt".into()));
    Err(Error::RetryExhausted {
        name: name.to_string(),
        attempts: max_attempts,
        last: Box::new(last),
    })
}
