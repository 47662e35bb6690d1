//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A maximum size of zero was requested
    #[error("Invalid capacity: {0} (max size must be at least 1)")]
    InvalidCapacity(usize),

    /// No executor was supplied and no tokio runtime is running
    #[error("No async runtime available: {0}")]
    NoRuntime(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
