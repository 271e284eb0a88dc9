//! Bounded retry with exponential backoff for transient failures.
//!
//! Only errors classified as transient (`MessagingError::is_transient`)
//! are retried; validation, authorization, and not-found outcomes are
//! returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::domain::messaging::MessagingError;

/// Backoff schedule for retrying transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    /// Doubles the backoff, capped at the configured maximum.
    pub fn next_backoff(&self, current: Duration) -> Duration {
        (current * 2).min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(250), Duration::from_secs(5))
    }
}

/// Runs `op`, retrying transient failures per the policy.
///
/// The final error is returned unchanged once attempts are exhausted.
pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, MessagingError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MessagingError>>,
{
    let mut attempt = 1;
    let mut backoff = policy.initial_backoff();
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_attempts() => {
                tracing::debug!(
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "transient failure; backing off before retry"
                );
                tokio::time::sleep(backoff).await;
                backoff = policy.next_backoff(backoff);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
