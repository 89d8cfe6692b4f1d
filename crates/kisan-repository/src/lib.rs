//! # Kisan Repository
//!
//! Durable last-known-good storage for perishable upstream data.
//!
//! ```text
//! CacheOrchestrator / Invalidator
//!   ↓  Arc<dyn DurableCache>
//! MySqlDurableCache  |  InMemoryDurableCache
//!   ↓
//! MySQL (perishable_cache)
//! ```
//!
//! Rows are keyed by `(domain, district, state, kind)` and are only ever
//! replaced by a newer fetch. Nothing here expires data; retention is the
//! job of whoever calls [`DurableCache::purge_fetched_before`].

pub mod memory;
pub mod mysql;
pub mod pool;
pub mod traits;

pub use memory::InMemoryDurableCache;
pub use mysql::*;
pub use pool::*;
pub use traits::*;
