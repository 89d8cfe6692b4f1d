//! # Kisan Core
//!
//! Core types, traits, and error definitions for the Kisan weather cache.
//! This crate provides the foundational abstractions shared by every layer:
//! cache keys, the read-path response contract, the error taxonomy and the
//! wall-clock abstraction used to stamp fetch times.

pub mod clock;
pub mod error;
pub mod key;
pub mod response;
pub mod result;
pub mod telemetry;

pub use clock::*;
pub use error::*;
pub use key::*;
pub use response::*;
pub use result::*;
