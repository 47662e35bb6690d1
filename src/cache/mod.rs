//! Cache Module
//!
//! Provides a bounded in-memory cache with LRU eviction and idle-time expiry.

mod concurrent;
mod entry;
mod lru;
mod stats;
mod store;


use std::time::Duration;

// Re-export public types
pub use concurrent::{CacheBuilder, EvictionCallback, LruCache};
pub(crate) use concurrent::Shared;
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::{ExpiryPass, OrderedMap, PutOutcome};

// == Public Constants ==
/// Shortest delay between two expiry scans of the same cache
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// TTL value meaning "never expire by time"
pub const NO_EXPIRY: i64 = -1;
