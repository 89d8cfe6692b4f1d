//! # Kisan REST
//!
//! REST API layer using Axum for the Kisan weather cache.
//! Exposes cached weather reads, cache introspection and invalidation,
//! health probes and the Prometheus scrape endpoint.

pub mod controllers;
pub mod middleware;
pub mod responses;
pub mod router;
pub mod state;

pub use router::*;
pub use state::*;
