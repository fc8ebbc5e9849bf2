//! Destination selection for the fixed pools.
//!
//! The balancer prefers idle workers when they exist without ever sorting
//! queue depths: scan forward from a cursor, take the first worker that is
//! waiting or nearly empty, and fall back to the cursor slot when nothing
//! qualifies. Ties resolve to the candidate at or after the cursor, which
//! keeps short bursts loosely affine to one worker without hard pinning.
//!
//! All reads are relaxed snapshots. A stale depth can only mis-place a task,
//! never mis-admit one: admission re-checks capacity under the destination
//! queue's own lock.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Queue depth at or below which a worker counts as "shallow".
const SHALLOW_DEPTH_MAX: usize = 1;

/// Load snapshot for one candidate worker.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CandidateLoad {
    pub(crate) waiting: bool,
    pub(crate) depth: usize,
}

/// Rotating cursor implementing the forward-scan selection rule.
#[derive(Debug)]
pub(crate) struct DispatchCursor {
    next: AtomicUsize,
}

impl DispatchCursor {
    pub(crate) fn new() -> Self {
        Self {
            next: AtomicUsize::new(0),
        }
    }

    /// Picks a destination among `n` workers, probing loads via `probe`.
    ///
    /// Concurrent producers may race on the cursor; the loss is placement
    /// quality only.
    pub(crate) fn pick(&self, n: usize, probe: impl Fn(usize) -> CandidateLoad) -> usize {
        debug_assert!(n > 0);
        let start = self.next.load(Ordering::Relaxed) % n;

        for step in 0..n {
            let idx = (start + step) % n;
            let load = probe(idx);
            if load.waiting || load.depth <= SHALLOW_DEPTH_MAX {
                self.next.store((idx + 1) % n, Ordering::Relaxed);
                return idx;
            }
        }

        // Every worker is busy and deep: fall back to the cursor slot.
        self.next.store((start + 1) % n, Ordering::Relaxed);
        start
    }
}
