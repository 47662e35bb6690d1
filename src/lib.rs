//! Timed LRU - a bounded in-process cache
//!
//! Thread-safe LRU cache with idle-time expiry and asynchronous eviction
//! callbacks, for embedding in connection pools, object caches and session
//! stores.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{CacheBuilder, CacheStats, EvictionCallback, LruCache};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::Executor;
