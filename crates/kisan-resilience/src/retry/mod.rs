//! Classified retry with bounded exponential backoff.

use kisan_core::UpstreamError;
use rand::Rng;
use std::fmt::{Debug, Display};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Classifies an error as worth retrying or not.
pub trait Retryable {
    /// Returns true when another attempt may succeed.
    fn is_retryable(&self) -> bool;
}

impl Retryable for UpstreamError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Outcome of a retried operation that never succeeded.
#[derive(Debug, Error)]
pub enum RetryError<E: Debug + Display> {
    /// A non-retryable error stopped the loop early.
    #[error("aborted after {attempts} attempt(s): {error}")]
    Aborted { attempts: u32, error: E },

    /// Every allowed attempt failed with a retryable error.
    #[error("exhausted after {attempts} attempt(s): {last_error}")]
    Exhausted { attempts: u32, last_error: E },
}

impl<E: Debug + Display> RetryError<E> {
    /// Total number of times the operation was invoked.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Aborted { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// The error from the final attempt.
    #[must_use]
    pub const fn last_error(&self) -> &E {
        match self {
            Self::Aborted { error, .. } => error,
            Self::Exhausted { last_error, .. } => last_error,
        }
    }

    /// Consumes the error, returning the final attempt's error.
    pub fn into_last_error(self) -> E {
        match self {
            Self::Aborted { error, .. } => error,
            Self::Exhausted { last_error, .. } => last_error,
        }
    }
}

/// Retry policy configuration.
///
/// An operation is invoked at most `max_retries + 1` times. The delay
/// before retry `n` is `initial_delay * multiplier^(n-1)`, capped at `max_delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
    /// Whether to add up to 25% jitter to delays.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given retry count and default backoff.
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Returns the maximum number of invocations.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Calculates the delay before the given retry (1-based).
    #[must_use]
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let base_millis = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped = base_millis.min(self.max_delay.as_millis() as f64).max(0.0);
        let delay = Duration::from_millis(capped as u64);

        if self.jitter {
            let factor = rand::thread_rng().gen_range(0.75..=1.25);
            delay.mul_f64(factor)
        } else {
            delay
        }
    }

    /// Runs `f` until it succeeds, fails with a non-retryable error,
    /// or the retry budget is spent.
    ///
    /// Retryable errors sleep for [`delay_for_retry`](Self::delay_for_retry)
    /// before the next attempt. No sleep follows the final attempt.
    pub async fn execute<F, Fut, T, E>(&self, mut f: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Debug + Display,
    {
        let mut attempts = 0;

        loop {
            attempts += 1;

            let error = match f().await {
                Ok(result) => {
                    if attempts > 1 {
                        debug!(attempts, "Operation succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(e) => e,
            };

            if !error.is_retryable() {
                debug!(attempts, error = %error, "Non-retryable error, giving up");
                return Err(RetryError::Aborted { attempts, error });
            }

            if attempts >= self.max_attempts() {
                warn!(attempts, error = %error, "Retry budget exhausted");
                return Err(RetryError::Exhausted {
                    attempts,
                    last_error: error,
                });
            }

            let delay = self.delay_for_retry(attempts);
            warn!(
                attempt = attempts,
                max_attempts = self.max_attempts(),
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Attempt failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_retry_success() {
        let policy = RetryPolicy::default();
        let result: Result<i32, RetryError<UpstreamError>> = policy.execute(|| async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_eventual_success() {
        let policy = RetryPolicy::default();
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result = policy
            .execute(|| {
                let attempts = attempts_clone.clone();
                async move {
                    let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                    if attempt < 2 {
                        Err(UpstreamError::transient("503 Service Unavailable"))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_exhaust_budget() {
        let policy = RetryPolicy::default();
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let start = Instant::now();

        let result: Result<(), _> = policy
            .execute(|| {
                let a = attempts_clone.clone();
                async move {
                    a.fetch_add(1, Ordering::SeqCst);
                    Err(UpstreamError::transient("timeout"))
                }
            })
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, RetryError::Exhausted { .. }));
        assert_eq!(err.attempts(), 4);
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        // 1s + 2s + 4s, no sleep after the last attempt
        assert_eq!(start.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_stops_immediately() {
        let policy = RetryPolicy::default();
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let start = Instant::now();

        let result: Result<(), _> = policy
            .execute(|| {
                let a = attempts_clone.clone();
                async move {
                    a.fetch_add(1, Ordering::SeqCst);
                    Err(UpstreamError::permanent("400 Bad Request"))
                }
            })
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, RetryError::Aborted { attempts: 1, .. }));
        assert_eq!(err.last_error(), &UpstreamError::permanent("400 Bad Request"));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_after_transient_keeps_attempt_count() {
        let policy = RetryPolicy::default();
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result: Result<(), _> = policy
            .execute(|| {
                let a = attempts_clone.clone();
                async move {
                    if a.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(UpstreamError::transient("connection reset"))
                    } else {
                        Err(UpstreamError::permanent("404 Not Found"))
                    }
                }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts(), 2);
        assert!(matches!(err.into_last_error(), UpstreamError::Permanent(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_single_attempt() {
        let policy = RetryPolicy::with_max_retries(0);
        let result: Result<(), _> = policy
            .execute(|| async { Err(UpstreamError::transient("fail")) })
            .await;
        assert_eq!(result.unwrap_err().attempts(), 1);
    }

    #[test]
    fn test_default_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_retry(0), Duration::ZERO);
        assert_eq!(policy.delay_for_retry(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_retry(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for_retry(3), Duration::from_secs(4));
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn test_delay_capped_at_max() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(100),
            multiplier: 1000.0,
            max_delay: Duration::from_millis(500),
            ..Default::default()
        };

        assert_eq!(policy.delay_for_retry(10), Duration::from_millis(500));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy {
            jitter: true,
            ..Default::default()
        };

        for _ in 0..100 {
            let delay = policy.delay_for_retry(2);
            assert!(delay >= Duration::from_millis(1500));
            assert!(delay <= Duration::from_millis(2500));
        }
    }

    #[test]
    fn test_upstream_error_classification() {
        assert!(UpstreamError::transient("503").is_retryable());
        assert!(!UpstreamError::permanent("400").is_retryable());
    }
}
