use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::domain::MethodId;

/// Registry of per-method mutexes. Stages for the same method serialize on
/// one guard; different methods never contend beyond the registry lookup.
///
/// The guards are blocking. Async callers hand stage work to
/// `tokio::task::spawn_blocking` so a waiting request parks a blocking
/// thread rather than a runtime worker.
#[derive(Debug, Default)]
pub struct MethodLocks {
    slots: Mutex<HashMap<MethodId, Arc<Mutex<()>>>>,
}

impl MethodLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, method: MethodId) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(method).or_default().clone()
    }

    /// Runs `work` while holding the lock for `method`.
    ///
    /// A guard poisoned by a panicking stage is recovered: the persisted stage
    /// marker, not the mutex, records whether that run completed.
    pub fn with_lock<T>(&self, method: MethodId, work: impl FnOnce() -> T) -> T {
        let slot = self.slot(method);
        let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        work()
    }

    /// Number of methods that have been locked at least once.
    pub fn tracked(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn same_method_never_overlaps() {
        let locks = Arc::new(MethodLocks::new());
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                thread::spawn(move || {
                    locks.with_lock(MethodId(3), || {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(5));
                        active.fetch_sub(1, Ordering::SeqCst);
                    });
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("worker finishes");
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(locks.tracked(), 1);
    }

    #[test]
    fn lock_survives_a_panicking_holder() {
        let locks = Arc::new(MethodLocks::new());
        let cloned = Arc::clone(&locks);
        let outcome = thread::spawn(move || {
            cloned.with_lock(MethodId(1), || panic!("stage blew up"));
        })
        .join();
        assert!(outcome.is_err());

        assert_eq!(locks.with_lock(MethodId(1), || 7), 7);
    }
}
