//! Task Executor
//!
//! Thin handle over a tokio runtime used by every cache for expiry timers and
//! eviction callbacks. Many caches can share one executor; it holds no
//! per-cache state.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::{CacheError, Result};

/// Where cache background work runs.
#[derive(Debug, Clone)]
pub struct Executor {
    handle: Handle,
}

impl Executor {
    /// Captures the runtime the caller is running in.
    ///
    /// Fails with [`CacheError::NoRuntime`] outside a tokio runtime.
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(Self::from_handle)
            .map_err(|e| CacheError::NoRuntime(e.to_string()))
    }

    /// Uses an explicit runtime handle.
    pub fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }

    /// Spawns a timer-driven task on the runtime.
    pub(crate) fn spawn<F>(&self, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// Runs a user callback on the blocking pool, fire and forget.
    ///
    /// A panic inside the callback is caught here and logged; it never
    /// reaches the caller, the scheduler, or other callbacks.
    pub fn dispatch<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.spawn_blocking(move || {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(callback)) {
                warn!(
                    "Eviction callback panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_current_outside_runtime() {
        let result = Executor::current();
        assert!(matches!(result, Err(CacheError::NoRuntime(_))));
    }

    #[tokio::test]
    async fn test_current_inside_runtime() {
        tokio_test::assert_ok!(Executor::current());
    }

    #[tokio::test]
    async fn test_dispatch_survives_panic() {
        let executor = Executor::current().unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        executor.dispatch(|| panic!("boom"));
        let tx_clone = tx.clone();
        executor.dispatch(move || {
            tx_clone.send("after panic").unwrap();
        });

        let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("Callback should run");
        assert_eq!(received, Some("after panic"));
    }

    #[test]
    fn test_panic_message_variants() {
        let static_payload: Box<dyn Any + Send> = Box::new("static");
        let owned_payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let other_payload: Box<dyn Any + Send> = Box::new(7u8);

        assert_eq!(panic_message(static_payload.as_ref()), "static");
        assert_eq!(panic_message(owned_payload.as_ref()), "owned");
        assert_eq!(panic_message(other_payload.as_ref()), "<non-string panic payload>");
    }
}
