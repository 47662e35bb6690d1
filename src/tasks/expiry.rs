//! TTL Expiry Task
//!
//! Per-cache background task that removes entries idle for longer than the
//! cache TTL. It is started lazily by the first insertion, rescans while
//! entries remain and ends itself once the cache is empty.
//!
//! Arming and disarming both happen while the cache mutex is held: an
//! insertion sets the flag after storing its entry, and a scan clears it only
//! after seeing an empty map. A `put` racing with a finishing scan therefore
//! either is seen by that scan or finds the flag already cleared and arms a
//! fresh task.

use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{OrderedMap, Shared};

// == Scheduler State ==
/// Armed flag, task handle and counters owned by one cache instance.
#[derive(Debug, Default)]
pub(crate) struct ExpiryScheduler {
    armed: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
    arms: AtomicU64,
    scans: AtomicU64,
    scans_in_flight: AtomicUsize,
    peak_scans_in_flight: AtomicUsize,
}

impl ExpiryScheduler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    pub(crate) fn arms(&self) -> u64 {
        self.arms.load(Ordering::Relaxed)
    }

    pub(crate) fn scans(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }

    pub(crate) fn peak_concurrent_scans(&self) -> usize {
        self.peak_scans_in_flight.load(Ordering::Relaxed)
    }

    /// IDLE -> ARMED. Only the caller that wins the swap may spawn.
    fn try_arm(&self) -> bool {
        let won = self
            .armed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.arms.fetch_add(1, Ordering::Relaxed);
        }
        won
    }

    fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
    }

    fn set_task(&self, handle: JoinHandle<()>) {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        *task = Some(handle);
    }

    /// Aborts a pending scan, used when the owning cache is dropped.
    pub(crate) fn abort(&mut self) {
        let task = self.task.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = task.take() {
            handle.abort();
        }
    }
}

// == Scan Guard ==
/// Holds the map lock for one in-flight scan. If the scan unwinds before
/// `finish`, the scheduler drops back to IDLE before the lock is released,
/// so an insertion that takes the lock next always finds it idle and re-arms.
struct ScanGuard<'a, K, V> {
    map: MutexGuard<'a, OrderedMap<K, V>>,
    scheduler: &'a ExpiryScheduler,
    finished: bool,
}

impl<'a, K, V> ScanGuard<'a, K, V> {
    fn enter(map: MutexGuard<'a, OrderedMap<K, V>>, scheduler: &'a ExpiryScheduler) -> Self {
        scheduler.scans.fetch_add(1, Ordering::Relaxed);
        let running = scheduler.scans_in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        scheduler
            .peak_scans_in_flight
            .fetch_max(running, Ordering::AcqRel);
        Self {
            map,
            scheduler,
            finished: false,
        }
    }

    /// Marks the scan complete and releases the lock.
    fn finish(mut self) {
        self.finished = true;
    }
}

// `drop` runs before the `map` field is dropped, so the lock is still held here
impl<K, V> Drop for ScanGuard<'_, K, V> {
    fn drop(&mut self) {
        self.scheduler.scans_in_flight.fetch_sub(1, Ordering::AcqRel);
        if !self.finished {
            self.scheduler.disarm();
        }
    }
}

/// Arms the scheduler for `shared` if it is idle.
///
/// Must be called while holding the cache mutex.
pub(crate) fn arm<K, V>(shared: &Arc<Shared<K, V>>, ttl: Duration)
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    if !shared.scheduler.try_arm() {
        return;
    }
    debug!("Expiry scheduler armed, first scan in {:?}", ttl);
    let handle = shared
        .executor
        .spawn(run_expiry(Arc::downgrade(shared), ttl));
    shared.scheduler.set_task(handle);
}

/// Sleeps, scans, and repeats until the cache is empty or dropped.
async fn run_expiry<K, V>(cache: Weak<Shared<K, V>>, ttl: Duration)
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    let mut delay = ttl;
    loop {
        tokio::time::sleep(delay).await;

        let Some(shared) = cache.upgrade() else {
            debug!("Cache dropped, expiry task exiting");
            return;
        };
        match scan(&shared, ttl) {
            Some(next) => delay = next,
            None => return,
        }
    }
}

/// Runs one expiry pass and returns the delay before the next one.
fn scan<K, V>(shared: &Shared<K, V>, ttl: Duration) -> Option<Duration>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    let pass = {
        let mut scan = ScanGuard::enter(shared.lock(), &shared.scheduler);
        let pass = scan.map.expire(Instant::now(), ttl);
        if pass.next_scan.is_none() {
            shared.scheduler.disarm();
        }
        scan.finish();
        pass
    };

    let removed = pass.expired.len();
    if removed > 0 {
        info!("TTL expiry: removed {} idle entries", removed);
    } else {
        debug!("TTL expiry: no idle entries found");
    }
    match pass.next_scan {
        Some(next) => debug!("Next expiry scan in {:?}", next),
        None => debug!("Cache empty, expiry scheduler idle"),
    }

    shared.dispatch(pass.expired);
    pass.next_scan
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_try_arm_is_idempotent() {
        let scheduler = ExpiryScheduler::new();

        assert!(scheduler.try_arm());
        assert!(!scheduler.try_arm());
        assert!(scheduler.is_armed());
        assert_eq!(scheduler.arms(), 1);

        scheduler.disarm();
        assert!(scheduler.try_arm());
        assert_eq!(scheduler.arms(), 2);
    }

    fn locked(map: &Mutex<OrderedMap<u8, u8>>) -> MutexGuard<'_, OrderedMap<u8, u8>> {
        map.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[test]
    fn test_scan_guard_disarms_on_unwind() {
        let scheduler = ExpiryScheduler::new();
        let map = Mutex::new(OrderedMap::new(4));
        scheduler.try_arm();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _scan = ScanGuard::enter(locked(&map), &scheduler);
            panic!("scan failed");
        }));

        assert!(result.is_err());
        assert!(!scheduler.is_armed(), "Failed scan should leave scheduler idle");
        assert_eq!(scheduler.scans(), 1);
        assert!(map.is_poisoned());
    }

    #[test]
    fn test_failed_scan_disarms_before_unlocking() {
        let scheduler = ExpiryScheduler::new();
        let map = Mutex::new(OrderedMap::new(4));
        scheduler.try_arm();

        let armed_after_unlock = thread::scope(|scope| {
            let (locked_tx, locked_rx) = std::sync::mpsc::channel();
            let (scheduler, map) = (&scheduler, &map);
            scope.spawn(move || {
                let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    let _scan = ScanGuard::enter(locked(map), scheduler);
                    locked_tx.send(()).unwrap();
                    thread::sleep(Duration::from_millis(50));
                    panic!("scan failed");
                }));
            });

            locked_rx.recv().unwrap();
            // Blocks until the failing scan releases the map
            let _map = locked(map);
            scheduler.is_armed()
        });

        assert!(!armed_after_unlock, "Insert after a failed scan must see IDLE");
    }

    #[test]
    fn test_scan_guard_finish_keeps_armed() {
        let scheduler = ExpiryScheduler::new();
        let map = Mutex::new(OrderedMap::<u8, u8>::new(4));
        scheduler.try_arm();

        ScanGuard::enter(locked(&map), &scheduler).finish();

        assert!(scheduler.is_armed());
        assert!(!map.is_poisoned());
        assert_eq!(scheduler.peak_concurrent_scans(), 1);
        assert_eq!(scheduler.scans_in_flight.load(Ordering::Relaxed), 0);
    }
}
