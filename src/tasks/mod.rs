//! Background Tasks Module
//!
//! Work that runs off the caller's thread.
//!
//! # Tasks
//! - Executor: runtime handle shared by caches for timers and callbacks
//! - TTL Expiry: per-cache scan that removes idle entries

pub(crate) mod expiry;
mod executor;

pub use executor::Executor;
pub(crate) use expiry::ExpiryScheduler;
