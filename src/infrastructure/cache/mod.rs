//! Caching implementations

pub mod persistent_cache;

pub use persistent_cache::{CACHE_TABLE, CacheEntry, CacheSettings, CacheStats, PersistentCache};
