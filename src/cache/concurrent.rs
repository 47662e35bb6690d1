//! Concurrent Cache Module
//!
//! Thread-safe cache handle: an [`OrderedMap`] behind a mutex, the per-cache
//! expiry scheduler, and asynchronous eviction callbacks.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::cache::{CacheStats, OrderedMap, NO_EXPIRY};
use crate::config::{ttl_from_millis, Config};
use crate::error::{CacheError, Result};
use crate::tasks::{expiry, ExpiryScheduler, Executor};

/// Callback invoked with every entry that leaves the cache.
pub type EvictionCallback<K, V> = Arc<dyn Fn(K, V) + Send + Sync>;

// == Shared State ==
/// State shared by every clone of one [`LruCache`].
pub(crate) struct Shared<K, V> {
    map: Mutex<OrderedMap<K, V>>,
    ttl: Option<Duration>,
    on_evict: Option<EvictionCallback<K, V>>,
    pub(crate) executor: Executor,
    pub(crate) scheduler: ExpiryScheduler,
}

impl<K, V> Shared<K, V>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Locks the map. A poisoned lock is recovered so the cache stays usable
    /// after a panic in another holder.
    pub(crate) fn lock(&self) -> MutexGuard<'_, OrderedMap<K, V>> {
        self.map.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hands removed entries to the eviction callback off the calling thread.
    pub(crate) fn dispatch(&self, entries: Vec<(K, V)>) {
        let Some(on_evict) = &self.on_evict else {
            return;
        };
        for (key, value) in entries {
            let on_evict = Arc::clone(on_evict);
            self.executor.dispatch(move || on_evict(key, value));
        }
    }
}

impl<K, V> Drop for Shared<K, V> {
    fn drop(&mut self) {
        self.scheduler.abort();
    }
}

// == LRU Cache ==
/// Bounded, thread-safe LRU cache with optional idle-time expiry.
///
/// Cloning is cheap and every clone refers to the same cache. Dropping the
/// last clone stops its expiry task.
///
/// # Example
/// ```ignore
/// let cache = LruCache::builder(100)
///     .ttl(Duration::from_secs(30))
///     .on_evict(|key: String, value: u32| println!("evicted {key}={value}"))
///     .build()?;
/// cache.put("a".to_string(), 1);
/// assert_eq!(cache.get(&"a".to_string()), Some(1));
/// ```
pub struct LruCache<K, V> {
    shared: Arc<Shared<K, V>>,
    duration_ms: i64,
}

impl<K, V> Clone for LruCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            duration_ms: self.duration_ms,
        }
    }
}

impl<K, V> fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("duration_ms", &self.duration_ms)
            .field("expiry_armed", &self.shared.scheduler.is_armed())
            .finish_non_exhaustive()
    }
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    // == Constructors ==
    /// Creates a cache on the current tokio runtime.
    ///
    /// # Arguments
    /// * `max_size` - Maximum number of entries, at least 1
    /// * `on_evict` - Optional callback for entries leaving the cache
    /// * `ttl_millis` - Idle TTL in milliseconds; zero or negative disables expiry
    pub fn new(
        max_size: usize,
        on_evict: Option<EvictionCallback<K, V>>,
        ttl_millis: i64,
    ) -> Result<Self> {
        let mut builder = Self::builder(max_size).ttl_millis(ttl_millis);
        builder.on_evict = on_evict;
        builder.build()
    }

    /// Starts configuring a cache bounded to `max_size` entries.
    pub fn builder(max_size: usize) -> CacheBuilder<K, V> {
        CacheBuilder {
            max_size,
            ttl_millis: NO_EXPIRY,
            on_evict: None,
            executor: None,
        }
    }

    /// Creates a cache from loaded configuration.
    pub fn from_config(
        config: &Config,
        on_evict: Option<EvictionCallback<K, V>>,
    ) -> Result<Self> {
        Self::new(config.max_size, on_evict, config.ttl_millis)
    }

    // == Put ==
    /// Stores `value` under `key`, making it the most recently used entry.
    ///
    /// Returns the value previously stored under `key`. If the cache grows
    /// past its bound, the least recently used entry is evicted and handed
    /// to the eviction callback.
    pub fn put(&self, key: K, value: V) -> Option<V> {
        let outcome = {
            let mut map = self.shared.lock();
            let outcome = map.put(key, value, Instant::now());
            self.arm_expiry();
            outcome
        };
        self.log_evictions(outcome.evicted.len());
        self.shared.dispatch(outcome.evicted);
        outcome.previous
    }

    // == Put If Absent ==
    /// Stores `value` only if `key` is not present.
    ///
    /// Returns the existing value when present, leaving it unchanged and in
    /// its current recency position.
    pub fn put_if_absent(&self, key: K, value: V) -> Option<V> {
        let outcome = {
            let mut map = self.shared.lock();
            let outcome = map.put_if_absent(key, value, Instant::now());
            if outcome.inserted {
                self.arm_expiry();
            }
            outcome
        };
        self.log_evictions(outcome.evicted.len());
        self.shared.dispatch(outcome.evicted);
        outcome.previous
    }

    // == Get ==
    /// Returns a copy of the value and refreshes its recency and idle timer.
    pub fn get(&self, key: &K) -> Option<V> {
        self.shared.lock().get(key, Instant::now())
    }

    // == Remove ==
    /// Removes `key`, handing the entry to the eviction callback.
    pub fn remove(&self, key: &K) -> Option<V> {
        let removed = self.shared.lock().remove(key)?;
        let value = removed.1.clone();
        self.shared.dispatch(vec![removed]);
        Some(value)
    }

    // == Contains ==
    /// Checks for `key` without touching its recency.
    pub fn contains_key(&self, key: &K) -> bool {
        self.shared.lock().contains_key(key)
    }

    // == Snapshot ==
    /// Point-in-time copy of all entries, safe to iterate without the lock.
    pub fn snapshot(&self) -> HashMap<K, V> {
        self.shared.lock().snapshot()
    }

    // == Capacity ==
    pub fn max_size(&self) -> usize {
        self.shared.lock().max_size()
    }

    /// Changes the entry bound.
    ///
    /// Shrinking below the current size evicts nothing immediately; the next
    /// insertion evicts the least recently used overflow.
    pub fn set_max_size(&self, max_size: usize) -> Result<()> {
        if max_size == 0 {
            return Err(CacheError::InvalidCapacity(max_size));
        }
        self.shared.lock().set_max_size(max_size);
        Ok(())
    }

    // == Duration ==
    /// Configured TTL in milliseconds, reported as given at construction.
    /// Zero or negative means expiry is disabled.
    pub fn duration(&self) -> i64 {
        self.duration_ms
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.lock().is_empty()
    }

    // == Stats ==
    /// Returns map counters merged with expiry scheduler counters.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.shared.lock().stats();
        let scheduler = &self.shared.scheduler;
        stats.scheduler_arms = scheduler.arms();
        stats.expiry_scans = scheduler.scans();
        stats.peak_concurrent_scans = scheduler.peak_concurrent_scans();
        stats
    }

    /// Whether an expiry scan is currently scheduled.
    pub fn is_expiry_armed(&self) -> bool {
        self.shared.scheduler.is_armed()
    }

    /// Called with the map lock held.
    fn arm_expiry(&self) {
        if let Some(ttl) = self.shared.ttl {
            expiry::arm(&self.shared, ttl);
        }
    }

    fn log_evictions(&self, count: usize) {
        if count > 0 {
            debug!("LRU eviction: {} entries over capacity", count);
        }
    }
}

// == Builder ==
/// Configures and creates an [`LruCache`].
pub struct CacheBuilder<K, V> {
    max_size: usize,
    ttl_millis: i64,
    on_evict: Option<EvictionCallback<K, V>>,
    executor: Option<Executor>,
}

impl<K, V> CacheBuilder<K, V>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Expire entries idle for `ttl`. Sub-millisecond values disable expiry.
    pub fn ttl(self, ttl: Duration) -> Self {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        self.ttl_millis(ttl_millis)
    }

    /// Expire entries idle for `ttl_millis` milliseconds; zero or negative disables expiry.
    pub fn ttl_millis(mut self, ttl_millis: i64) -> Self {
        self.ttl_millis = ttl_millis;
        self
    }

    /// Callback for entries leaving the cache through eviction, expiry or removal.
    pub fn on_evict<F>(mut self, on_evict: F) -> Self
    where
        F: Fn(K, V) + Send + Sync + 'static,
    {
        self.on_evict = Some(Arc::new(on_evict));
        self
    }

    /// Runs timers and callbacks on `executor` instead of the current runtime.
    pub fn executor(mut self, executor: Executor) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn build(self) -> Result<LruCache<K, V>> {
        if self.max_size == 0 {
            return Err(CacheError::InvalidCapacity(self.max_size));
        }
        let executor = match self.executor {
            Some(executor) => executor,
            None => Executor::current()?,
        };
        let ttl = ttl_from_millis(self.ttl_millis);

        debug!(
            "Creating LRU cache: max_size={}, ttl_ms={}, expiry={}",
            self.max_size,
            self.ttl_millis,
            ttl.is_some()
        );

        Ok(LruCache {
            shared: Arc::new(Shared {
                map: Mutex::new(OrderedMap::new(self.max_size)),
                ttl,
                on_evict: self.on_evict,
                executor,
                scheduler: ExpiryScheduler::new(),
            }),
            duration_ms: self.ttl_millis,
        })
    }
}
