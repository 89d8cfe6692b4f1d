//! Timeout wrapper for async operations.

use kisan_core::{KisanError, UpstreamError};
use std::time::Duration;
use thiserror::Error;

/// An operation did not finish within its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Operation timed out after {after:?}")]
pub struct TimedOut {
    /// The deadline that elapsed.
    pub after: Duration,
}

impl From<TimedOut> for UpstreamError {
    fn from(err: TimedOut) -> Self {
        Self::Transient(err.to_string())
    }
}

impl From<TimedOut> for KisanError {
    fn from(err: TimedOut) -> Self {
        Self::Timeout(err.to_string())
    }
}

/// Wraps an async operation with a timeout.
///
/// The inner future is dropped when the deadline elapses.
pub async fn with_timeout<F, Fut, T, E>(duration: Duration, f: F) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: From<TimedOut>,
{
    tokio::time::timeout(duration, f())
        .await
        .map_err(|_| E::from(TimedOut { after: duration }))?
}
