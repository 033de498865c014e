//! In-process caching.

pub mod memory;

pub use memory::{CacheConfig, CacheStats, MemoryCache};
