//! # Kisan Server Library
//!
//! Wires configuration into cache tiers, the upstream client and the REST
//! router, and provides startup helpers for the binary.

pub mod app;
pub mod startup;

pub use app::*;
