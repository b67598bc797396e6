/*!
 * Bounded exponential backoff around a single provider call.
 */

use std::future::Future;
use std::time::Duration;
use log::warn;

use crate::errors::ProviderError;

/// How often and how patiently a failed call is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; at most `max_retries + 1` attempts run
    pub max_retries: u32,
    /// Delay before the first retry, doubled on each further retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self { max_retries, base_delay }
    }

    /// Delay after failed attempt `attempt` (1-based): `base_delay * 2^(attempt-1)`
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// runs out of attempts.
///
/// `on_retry` is called with the failed attempt number and its error right
/// before each backoff sleep.
pub async fn with_retry<T, F, Fut, R>(
    policy: &RetryPolicy,
    mut operation: F,
    mut on_retry: R,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
    R: FnMut(u32, &ProviderError),
{
    let max_attempts = policy.max_retries + 1;
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) if attempt >= max_attempts => {
                warn!("Giving up after {} attempts: {}", attempt, e);
                return Err(e);
            }
            Err(e) => {
                let backoff = policy.backoff_for_attempt(attempt);
                warn!(
                    "Attempt {}/{} failed: {} - retrying in {:?}",
                    attempt, max_attempts, e, backoff
                );
                on_retry(attempt, &e);
                tokio::time::sleep(backoff).await;
            }
        }
    }
}
