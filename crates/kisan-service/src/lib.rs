//! # Kisan Service
//!
//! The resilient read path for perishable upstream data.
//!
//! A read for `(kind, district, state)` goes through, in order:
//!
//! 1. the TTL-bounded [`FastCache`](cache::FastCache),
//! 2. the upstream source, wrapped in classified retry,
//! 3. the durable last-known-good store,
//!
//! and otherwise fails with [`NoFallbackAvailable`](kisan_core::NoFallbackAvailable).
//! Every successful upstream fetch is written to both tiers by the
//! [`Invalidator`].

pub mod cache;
pub mod invalidator;
pub mod metrics;
pub mod orchestrator;
pub mod service;
pub mod singleflight;
pub mod upstream;

#[cfg(test)]
mod test_support;

pub use cache::{create_redis_pool, FastCache, FastEntry, InMemoryFastCache, RedisFastCache};
pub use invalidator::Invalidator;
pub use orchestrator::CacheOrchestrator;
pub use service::{CacheStatus, WeatherDataService};
pub use singleflight::{InFlight, TaskFailed};
pub use upstream::{ImdHttpClient, UpstreamClient};
