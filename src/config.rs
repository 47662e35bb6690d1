//! Configuration Module
//!
//! Handles loading cache and demo parameters from environment variables.

use std::env;
use std::time::Duration;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub max_size: usize,
    /// Idle time in milliseconds before an entry expires (<= 0 disables expiry)
    pub ttl_millis: i64,
    /// Number of keys the demo binary inserts
    pub demo_inserts: usize,
    /// Pause between demo inserts in milliseconds
    pub demo_interval_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `LRU_MAX_SIZE` - Maximum cache entries (default: 10)
    /// - `LRU_TTL_MS` - Entry idle TTL in milliseconds (default: 5000)
    /// - `DEMO_INSERTS` - Keys inserted by the demo (default: 11)
    /// - `DEMO_INTERVAL_MS` - Pause between demo inserts (default: 1000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_size: parse_var("LRU_MAX_SIZE").unwrap_or(defaults.max_size),
            ttl_millis: parse_var("LRU_TTL_MS").unwrap_or(defaults.ttl_millis),
            demo_inserts: parse_var("DEMO_INSERTS").unwrap_or(defaults.demo_inserts),
            demo_interval_ms: parse_var("DEMO_INTERVAL_MS").unwrap_or(defaults.demo_interval_ms),
        }
    }

    /// Returns the TTL as a Duration, or None when expiry is disabled.
    pub fn ttl(&self) -> Option<Duration> {
        ttl_from_millis(self.ttl_millis)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_size: 10,
            ttl_millis: 5000,
            demo_inserts: 11,
            demo_interval_ms: 1000,
        }
    }
}

/// Converts a millisecond TTL into a Duration; non-positive values disable expiry.
pub(crate) fn ttl_from_millis(ttl_millis: i64) -> Option<Duration> {
    u64::try_from(ttl_millis)
        .ok()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_size, 10);
        assert_eq!(config.ttl_millis, 5000);
        assert_eq!(config.demo_inserts, 11);
        assert_eq!(config.demo_interval_ms, 1000);
        assert_eq!(config.ttl(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("LRU_MAX_SIZE");
        env::remove_var("LRU_TTL_MS");
        env::remove_var("DEMO_INSERTS");
        env::remove_var("DEMO_INTERVAL_MS");

        let config = Config::from_env();
        assert_eq!(config.max_size, 10);
        assert_eq!(config.ttl_millis, 5000);
        assert_eq!(config.demo_inserts, 11);
        assert_eq!(config.demo_interval_ms, 1000);
    }

    #[test]
    fn test_ttl_disabled_for_non_positive_values() {
        assert_eq!(ttl_from_millis(-1), None);
        assert_eq!(ttl_from_millis(0), None);
        assert_eq!(ttl_from_millis(250), Some(Duration::from_millis(250)));
    }
}
