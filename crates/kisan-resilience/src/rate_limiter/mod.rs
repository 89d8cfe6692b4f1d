//! Outbound rate limiter.

use governor::{
    clock::DefaultClock,
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorRateLimiter,
};
use kisan_core::KisanError;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

/// Rate limiter for controlling outbound request rates.
///
/// Clones share the same budget.
pub struct RateLimiter {
    limiter: Arc<GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
}

impl RateLimiter {
    /// Creates a rate limiter with requests per minute.
    ///
    /// A zero budget is raised to one request per minute.
    pub fn per_minute(requests: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN));
        let limiter = Arc::new(GovernorRateLimiter::direct(quota));
        Self { limiter }
    }

    /// Checks if a request is allowed (non-blocking).
    pub fn check(&self) -> Result<(), KisanError> {
        self.limiter
            .check()
            .map_err(|_| KisanError::RateLimitExceeded)
    }

    /// Waits until a request is allowed.
    pub async fn wait(&self) {
        if self.limiter.check().is_ok() {
            return;
        }
        debug!("Outbound rate limit reached, waiting for capacity");
        self.limiter.until_ready().await;
    }
}

impl Clone for RateLimiter {
    fn clone(&self) -> Self {
        Self {
            limiter: Arc::clone(&self.limiter),
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}
