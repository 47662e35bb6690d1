//! Cache Entry Module
//!
//! Defines the value wrapper that records when an entry was last touched.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A stored value plus the instant it was last read or written.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Last read or write
    pub last_touched: Instant,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry touched at `now`.
    pub fn new(value: V, now: Instant) -> Self {
        Self {
            value,
            last_touched: now,
        }
    }

    // == Touch ==
    /// Refreshes the last-touched instant.
    pub fn touch(&mut self, now: Instant) {
        self.last_touched = now;
    }

    // == Age ==
    /// Idle time since the last touch, saturating at zero.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_touched)
    }

    // == Is Expired ==
    /// Checks if the entry has been idle for at least `ttl`.
    ///
    /// Boundary condition: an entry whose age equals the TTL is expired.
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        self.age(now) >= ttl
    }

    // == Time To Live ==
    /// Remaining idle time before the entry expires, zero once expired.
    pub fn ttl_remaining(&self, now: Instant, ttl: Duration) -> Duration {
        ttl.saturating_sub(self.age(now))
    }
}
