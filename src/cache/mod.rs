//! Caching
//!
//! TTL cache shared by the price helpers.

mod memory;

pub use memory::{CacheEntry, CacheStats, MemoryCache, DEFAULT_SWEEP_INTERVAL};
