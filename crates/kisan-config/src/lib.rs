//! # Kisan Config
//!
//! Configuration management for the Kisan weather cache.
//! Supports layered configuration from files and environment variables,
//! per-kind cache policies and fail-fast validation.

mod app_config;
mod loader;
mod validation;

pub use app_config::*;
pub use loader::*;
pub use validation::*;
