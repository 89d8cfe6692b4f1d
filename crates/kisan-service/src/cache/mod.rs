//! Fast cache tier.
//!
//! Payload and fetch timestamp are stored under two keys sharing one TTL
//! and are always written and read together.

mod fast_cache;
mod memory;
mod redis_cache;

pub use fast_cache::{decode_pair, encode_timestamp, FastCache, FastEntry};
pub use memory::InMemoryFastCache;
pub use redis_cache::{create_redis_pool, RedisFastCache};
