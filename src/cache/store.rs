//! Ordered Map Module
//!
//! Bounded key-value storage kept in access order. This is the single-threaded
//! core; [`crate::cache::LruCache`] wraps it in a mutex and adds the expiry
//! scheduler and eviction callbacks.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use crate::cache::{CacheEntry, CacheStats, LruTracker, MIN_POLL_INTERVAL};

#[derive(Debug)]
struct Slot<V> {
    entry: CacheEntry<V>,
    node: usize,
}

// == Outcomes ==
/// Result of a `put`: the replaced value plus any capacity evictions.
#[derive(Debug)]
pub struct PutOutcome<K, V> {
    pub previous: Option<V>,
    pub evicted: Vec<(K, V)>,
    /// False only when `put_if_absent` found the key already present
    pub inserted: bool,
}

/// Result of one expiry pass.
#[derive(Debug)]
pub struct ExpiryPass<K, V> {
    /// Entries whose idle age reached the TTL, oldest first
    pub expired: Vec<(K, V)>,
    /// When to scan again, None once the map is empty
    pub next_scan: Option<Duration>,
}

// == Ordered Map ==
/// Access-ordered map with a maximum entry count.
#[derive(Debug)]
pub struct OrderedMap<K, V> {
    entries: HashMap<K, Slot<V>>,
    order: LruTracker<K>,
    stats: CacheStats,
    max_size: usize,
}

impl<K, V> OrderedMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    // == Constructor ==
    /// Creates an empty map bounded to `max_size` entries.
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: LruTracker::new(),
            stats: CacheStats::new(),
            max_size,
        }
    }

    // == Put ==
    /// Inserts or replaces `key`, making it the most recently used.
    ///
    /// Any overflow past `max_size` is evicted from the least recently used end.
    pub fn put(&mut self, key: K, value: V, now: Instant) -> PutOutcome<K, V> {
        let previous = match self.entries.get_mut(&key) {
            Some(slot) => {
                let old = std::mem::replace(&mut slot.entry, CacheEntry::new(value, now));
                self.order.touch(slot.node);
                Some(old.value)
            }
            None => {
                self.insert_new(key, value, now);
                None
            }
        };

        PutOutcome {
            previous,
            evicted: self.evict_overflow(),
            inserted: true,
        }
    }

    // == Put If Absent ==
    /// Inserts only when `key` is absent.
    ///
    /// An existing entry is returned as `previous` untouched: no reorder, no
    /// timestamp refresh, and `inserted` stays false.
    pub fn put_if_absent(&mut self, key: K, value: V, now: Instant) -> PutOutcome<K, V> {
        if let Some(slot) = self.entries.get(&key) {
            return PutOutcome {
                previous: Some(slot.entry.value.clone()),
                evicted: Vec::new(),
                inserted: false,
            };
        }

        self.insert_new(key, value, now);
        PutOutcome {
            previous: None,
            evicted: self.evict_overflow(),
            inserted: true,
        }
    }

    // == Get ==
    /// Returns a clone of the value and marks the entry most recently used.
    pub fn get(&mut self, key: &K, now: Instant) -> Option<V> {
        match self.entries.get_mut(key) {
            Some(slot) => {
                slot.entry.touch(now);
                self.order.touch(slot.node);
                self.stats.record_hit();
                Some(slot.entry.value.clone())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Remove ==
    /// Removes `key`, returning the stored key and value.
    pub fn remove(&mut self, key: &K) -> Option<(K, V)> {
        let (key, value) = self.take(key)?;
        self.stats.record_removal();
        Some((key, value))
    }

    // == Contains ==
    /// Presence check that leaves the access order alone.
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    // == Snapshot ==
    /// Copies every key and value out of the map.
    pub fn snapshot(&self) -> HashMap<K, V> {
        self.entries
            .iter()
            .map(|(key, slot)| (key.clone(), slot.entry.value.clone()))
            .collect()
    }

    // == Expire ==
    /// Removes entries idle for at least `ttl`, scanning oldest first.
    ///
    /// Every touch refreshes recency and timestamp together, so the scan stops
    /// at the first entry still within its TTL.
    pub fn expire(&mut self, now: Instant, ttl: Duration) -> ExpiryPass<K, V> {
        let mut stale = Vec::new();
        let mut next_scan = MIN_POLL_INTERVAL;

        for key in self.order.iter() {
            let Some(slot) = self.entries.get(key) else {
                continue;
            };
            if slot.entry.is_expired(now, ttl) {
                stale.push(key.clone());
            } else {
                next_scan = next_scan.max(slot.entry.ttl_remaining(now, ttl));
                break;
            }
        }

        let expired: Vec<(K, V)> = stale.iter().filter_map(|key| self.take(key)).collect();
        self.stats.record_expirations(expired.len());

        ExpiryPass {
            expired,
            next_scan: (!self.entries.is_empty()).then_some(next_scan),
        }
    }

    // == Capacity ==
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Changes the bound. Shrinking evicts nothing until the next insertion.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Length ==
    /// Returns the current number of entries in the map.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys from least to most recently used.
    pub fn keys_by_recency(&self) -> impl Iterator<Item = &K> {
        self.order.iter()
    }

    fn insert_new(&mut self, key: K, value: V, now: Instant) {
        let node = self.order.push_back(key.clone());
        self.entries.insert(
            key,
            Slot {
                entry: CacheEntry::new(value, now),
                node,
            },
        );
    }

    fn take(&mut self, key: &K) -> Option<(K, V)> {
        let slot = self.entries.remove(key)?;
        let key = self.order.remove(slot.node)?;
        Some((key, slot.entry.value))
    }

    fn evict_overflow(&mut self) -> Vec<(K, V)> {
        let mut evicted = Vec::new();
        while self.entries.len() > self.max_size {
            let Some(oldest) = self.order.evict_oldest() else {
                break;
            };
            if let Some(slot) = self.entries.remove(&oldest) {
                self.stats.record_eviction();
                evicted.push((oldest, slot.entry.value));
            }
        }
        evicted
    }
}
