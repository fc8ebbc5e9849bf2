//! Pool-wide wait/notify gate.
//!
//! One mutex + condvar pair serves every blocking site in a pool:
//! `wait_for_tasks`, producers blocked by a bounded queue, and the dynamic
//! pool's thread-count waits. The hot path (task execution) must stay cheap,
//! so notifiers first read an atomic waiter count and skip the lock entirely
//! when nobody can be sleeping.
//!
//! Lost-wakeup protocol: a waiter publishes itself in `waiters` and then
//! re-checks the predicate *before* sleeping. A notifier that changes state
//! and then observes `waiters == 0` is therefore ordered before the waiter's
//! second predicate check, which must see the new state.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};

#[derive(Debug, Default)]
pub(crate) struct SyncGate {
    lock: Mutex<()>,
    cond: Condvar,
    waiters: AtomicUsize,
}

impl SyncGate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Blocks the caller until `pred` returns true.
    ///
    /// `pred` reads pool state through atomics; it must be safe to call any
    /// number of times and must eventually be made true by a thread that
    /// calls [`SyncGate::notify_waiters`] after the state change.
    pub(crate) fn wait_until(&self, pred: impl Fn() -> bool) {
        let mut guard = self.lock.lock().unwrap();
        loop {
            if pred() {
                return;
            }
            self.waiters.fetch_add(1, Ordering::SeqCst);
            // Re-check after publishing ourselves: a notifier that missed the
            // waiter count must have changed state before this read.
            if pred() {
                self.waiters.fetch_sub(1, Ordering::SeqCst);
                return;
            }
            guard = self.cond.wait(guard).unwrap();
            self.waiters.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Wakes every current waiter. Cheap when nobody waits.
    pub(crate) fn notify_waiters(&self) {
        if self.waiters.load(Ordering::SeqCst) == 0 {
            return;
        }
        // Taking the mutex orders this notify after the waiter's transition
        // into `cond.wait`, so the wakeup cannot fall into the gap.
        let _guard = self.lock.lock().unwrap();
        self.cond.notify_all();
    }
}
