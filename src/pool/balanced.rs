//! Balanced pool: one locked deque per worker.
//!
//! Producers and the owning worker share a single spinlocked deque, so every
//! queued task stays reachable under the lock until the moment it is handed
//! out. The balancer's depth snapshots track reality closely because
//! nothing hides in a private buffer; the price is one lock round-trip per
//! pull.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::stdx::SpinLock;

use super::fixed::{FixedPool, QueueFlavor};
use super::task::Task;

/// Single spinlocked deque, one per balanced-pool worker.
pub struct SingleQueue {
    queue: SpinLock<VecDeque<Task>>,
    depth: AtomicUsize,
}

impl QueueFlavor for SingleQueue {
    type Local = ();

    fn new() -> Self {
        Self {
            queue: SpinLock::new(VecDeque::new()),
            depth: AtomicUsize::new(0),
        }
    }

    fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    fn try_push(&self, task: Task, capacity: usize) -> Result<(), Task> {
        let mut queue = self.queue.lock();
        if capacity != 0 && queue.len() >= capacity {
            return Err(task);
        }
        queue.push_back(task);
        self.depth.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn push_batch(&self, tasks: Vec<Task>) {
        let n = tasks.len();
        let mut queue = self.queue.lock();
        queue.extend(tasks);
        self.depth.fetch_add(n, Ordering::SeqCst);
    }

    fn pull(&self, _local: &mut ()) -> Option<Task> {
        let task = self.queue.lock().pop_front();
        if task.is_some() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
        }
        task
    }
}

/// Fixed-width pool whose workers pop a single shared-per-worker locked
/// queue.
///
/// ```
/// use taskpool_rs::{BalancedPool, TaskPool};
///
/// let pool = BalancedPool::new(4);
/// pool.submit(|| {}).unwrap();
/// pool.wait_for_tasks();
/// pool.close();
/// ```
pub type BalancedPool = FixedPool<SingleQueue>;
