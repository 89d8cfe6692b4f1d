//! MySQL implementations.

mod durable_cache;

pub use durable_cache::MySqlDurableCache;
