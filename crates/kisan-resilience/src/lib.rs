//! # Kisan Resilience
//!
//! Resilience patterns for the Kisan weather cache.
//! Provides classified retry with bounded exponential backoff,
//! per-attempt timeouts and outbound rate limiting.

pub mod rate_limiter;
pub mod retry;
pub mod timeout;

pub use rate_limiter::*;
pub use retry::*;
pub use timeout::*;
