//! Retry policy for port calls
//!
//! A single policy object is applied at the data-access boundary instead of
//! wrapping individual calls by hand. Only errors accepted by the policy's
//! predicate are retried; by default that is [`PortError::is_transient`], which
//! never matches permission failures.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ports::PortError;

/// How the delay grows between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    Fixed,
    Linear,
    Exponential,
}

/// Bounded retry with backoff
#[derive(Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff: Backoff,
    retryable: fn(&PortError) -> bool,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            backoff: Backoff::Exponential,
            retryable: PortError::is_transient,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff,
            ..Self::default()
        }
    }

    /// A policy that performs exactly one attempt
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Replaces the retryable-error predicate
    pub fn retry_when(mut self, predicate: fn(&PortError) -> bool) -> Self {
        self.retryable = predicate;
        self
    }

    pub fn is_retryable(&self, error: &PortError) -> bool {
        (self.retryable)(error)
    }

    /// Delay before retry number `retry` (1-based), capped at `max_delay`
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let retry = retry.max(1);
        let delay = match self.backoff {
            Backoff::Fixed => self.base_delay,
            Backoff::Linear => self.base_delay.saturating_mul(retry),
            Backoff::Exponential => {
                let factor = 1u32.checked_shl(retry - 1).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor)
            }
        };
        delay.min(self.max_delay)
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt bound is reached. The last error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, PortError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PortError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt < attempts && self.is_retryable(&error) => {
                    let delay = self.delay_for_retry(attempt);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO, Backoff::Fixed)
    }

    #[test]
    fn test_exponential_delays_are_capped() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), Backoff::Exponential)
            .max_delay(Duration::from_millis(350));
        assert_eq!(policy.delay_for_retry(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_retry(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_retry(3), Duration::from_millis(350));
        assert_eq!(policy.delay_for_retry(40), Duration::from_millis(350));
    }

    #[test]
    fn test_linear_delays() {
        let policy = RetryPolicy::new(5, Duration::from_millis(120), Backoff::Linear);
        assert_eq!(policy.delay_for_retry(3), Duration::from_millis(360));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = instant_policy(3)
            .run("fetch_claims", move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(PortError::connection("reset"))
                } else {
                    Ok(42)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = instant_policy(3)
            .run("fetch_claims", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(PortError::connection("down"))
            })
            .await;
        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permission_denied_is_never_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = instant_policy(5)
            .run("fetch_claims", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(PortError::permission_denied("row level security"))
            })
            .await;
        assert!(result.unwrap_err().is_permission_denied());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_custom_predicate() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let policy = instant_policy(4).retry_when(|_| false);
        let _: Result<(), _> = policy
            .run("fetch_claims", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(PortError::connection("down"))
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
