//! Test-and-set spinlock guarding the worker-local task queues.
//!
//! Critical sections in the pool are tiny (push one task, swap two deques),
//! so a userspace spin with a pause hint beats a kernel mutex on the hot
//! path. The contended path is tiered: a short bounded spin with
//! `spin_loop()` hints, then an OS yield. Hosts reporting a single hardware
//! thread skip straight to yielding, since spinning there can only burn the
//! quantum the lock holder needs.
//!
//! Not reentrant. `try_lock` never blocks. The guard releases on all exits.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use std::sync::OnceLock;

#[cfg(not(loom))]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(not(loom))]
use std::thread;

#[cfg(loom)]
use loom::sync::atomic::{AtomicBool, Ordering};
#[cfg(loom)]
use loom::thread;

/// Spin iterations before a contended waiter yields the CPU.
const SPINS_BEFORE_YIELD: u32 = 16;

/// True when the host exposes a single hardware thread.
fn uniprocessor() -> bool {
    static UNIPROCESSOR: OnceLock<bool> = OnceLock::new();
    *UNIPROCESSOR.get_or_init(|| num_cpus::get() <= 1)
}

/// Mutual exclusion via a single test-and-set bit.
///
/// Intended for nanosecond-scale critical sections only; anything that can
/// block (I/O, allocation-heavy work) belongs under a real mutex.
pub struct SpinLock<T> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

// SpinLock hands out exclusive access to T, one holder at a time.
unsafe impl<T: Send> Send for SpinLock<T> {}
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(value),
        }
    }

    /// Acquires the lock, spinning until it is available.
    #[inline]
    pub fn lock(&self) -> SpinGuard<'_, T> {
        let mut spins = 0u32;
        loop {
            if !self.locked.swap(true, Ordering::Acquire) {
                return SpinGuard { lock: self };
            }
            // Wait on a plain load so contended waiters don't ping-pong the
            // cache line with failed swaps.
            while self.locked.load(Ordering::Relaxed) {
                if uniprocessor() || spins >= SPINS_BEFORE_YIELD {
                    thread::yield_now();
                    spins = 0;
                } else {
                    core::hint::spin_loop();
                    spins += 1;
                }
            }
        }
    }

    /// Acquires the lock only if it is free right now.
    #[inline]
    pub fn try_lock(&self) -> Option<SpinGuard<'_, T>> {
        if self.locked.swap(true, Ordering::Acquire) {
            None
        } else {
            Some(SpinGuard { lock: self })
        }
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: core::fmt::Debug> core::fmt::Debug for SpinLock<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.try_lock() {
            Some(guard) => f.debug_tuple("SpinLock").field(&*guard).finish(),
            None => f.write_str("SpinLock(<locked>)"),
        }
    }
}

/// RAII guard; releases the lock on drop.
pub struct SpinGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<T> Deref for SpinGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // Holding the guard means holding the lock.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}


#[cfg(all(test, loom))]
mod loom_tests {
    use super::*;
    use loom::sync::Arc;
    use loom::thread;

    /// Two writers under loom's exhaustive scheduler never interleave
    /// inside the critical section.
    #[test]
    fn loom_mutual_exclusion() {
        loom::model(|| {
            let lock = Arc::new(SpinLock::new(0u32));
            let other = Arc::clone(&lock);

            let t = thread::spawn(move || {
                let mut guard = other.lock();
                let v = *guard;
                *guard = v + 1;
            });

            {
                let mut guard = lock.lock();
                let v = *guard;
                *guard = v + 1;
            }

            t.join().unwrap();
            assert_eq!(*lock.lock(), 2);
        });
    }
}
