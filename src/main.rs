//! Timed LRU demo
//!
//! Fills a small cache one key at a time so capacity evictions and idle
//! expiry show up in the log, then prints the final statistics.

use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use timed_lru::cache::MIN_POLL_INTERVAL;
use timed_lru::{Config, LruCache};

/// Demo entry point.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create a cache that logs every eviction
/// 4. Insert `DEMO_INSERTS` keys, one per `DEMO_INTERVAL_MS`
/// 5. Wait for idle entries to expire, then print stats as JSON
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "timed_lru=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_size={}, ttl_ms={}, inserts={}, interval={}ms",
        config.max_size, config.ttl_millis, config.demo_inserts, config.demo_interval_ms
    );

    let cache: LruCache<String, String> = LruCache::builder(config.max_size)
        .ttl_millis(config.ttl_millis)
        .on_evict(|key: String, value: String| {
            info!("Entry evicted: key = {}, value = {}", key, value)
        })
        .build()
        .context("failed to create cache")?;

    tokio::select! {
        _ = run_demo(&cache, &config) => {}
        _ = shutdown_signal() => {
            warn!("Demo interrupted");
        }
    }

    let stats = cache.stats();
    info!("Final stats: {}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

async fn run_demo(cache: &LruCache<String, String>, config: &Config) {
    let interval = Duration::from_millis(config.demo_interval_ms);
    for i in 0..config.demo_inserts {
        cache.put(format!("key{}", i), format!("value{}", i));
        info!("Inserted key{} (size {}/{})", i, cache.len(), cache.max_size());
        tokio::time::sleep(interval).await;
    }

    if let Some(ttl) = config.ttl() {
        info!("Waiting for idle entries to expire");
        while !cache.is_empty() {
            tokio::time::sleep(ttl.min(MIN_POLL_INTERVAL)).await;
        }
        info!("All entries expired");
    }
}

/// Waits for Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
}
