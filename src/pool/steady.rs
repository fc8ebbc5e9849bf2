//! Steady pool: dual-queue workers with swap-amortized locking.
//!
//! Producers append to a worker's *public* deque under the spinlock. The
//! worker executes out of a thread-private *buffer*: when the buffer runs
//! dry, one lock acquisition swaps the whole public deque into the buffer,
//! and every task in that batch then runs without touching the lock again.
//! One lock round-trip is amortized over an entire burst, which is where
//! this pool earns its throughput on small tasks.
//!
//! Invariants:
//! - The buffer is empty whenever a swap begins (the worker only swaps after
//!   draining it).
//! - `depth` counts public + buffer tasks, so a bounded steady pool caps the
//!   *combined* backlog per worker.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::stdx::SpinLock;

use super::fixed::{FixedPool, QueueFlavor};
use super::task::Task;

/// Public queue + private execution buffer, one per steady-pool worker.
pub struct DualQueue {
    public: SpinLock<VecDeque<Task>>,
    /// Tasks in `public` plus tasks still in the worker's buffer.
    depth: AtomicUsize,
}

impl QueueFlavor for DualQueue {
    /// The worker's execution buffer; never shared across threads.
    type Local = VecDeque<Task>;

    fn new() -> Self {
        Self {
            public: SpinLock::new(VecDeque::new()),
            depth: AtomicUsize::new(0),
        }
    }

    fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    fn try_push(&self, task: Task, capacity: usize) -> Result<(), Task> {
        let mut public = self.public.lock();
        if capacity != 0 && self.depth.load(Ordering::Relaxed) >= capacity {
            return Err(task);
        }
        public.push_back(task);
        self.depth.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn push_batch(&self, tasks: Vec<Task>) {
        let n = tasks.len();
        let mut public = self.public.lock();
        public.extend(tasks);
        self.depth.fetch_add(n, Ordering::SeqCst);
    }

    fn pull(&self, buffer: &mut VecDeque<Task>) -> Option<Task> {
        if let Some(task) = buffer.pop_front() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            return Some(task);
        }

        {
            let mut public = self.public.lock();
            if public.is_empty() {
                return None;
            }
            debug_assert!(buffer.is_empty());
            core::mem::swap(&mut *public, buffer);
        }

        let task = buffer.pop_front();
        debug_assert!(task.is_some());
        if task.is_some() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
        }
        task
    }
}

/// Fixed-width pool whose workers drain a public queue by swapping it into a
/// private buffer.
///
/// ```
/// use taskpool_rs::{SteadyPool, TaskPool};
///
/// let pool = SteadyPool::new(4);
/// let answer = pool.submit_with_handle(|| 2023).unwrap();
/// assert_eq!(answer.join(), 2023);
/// pool.close();
/// ```
pub type SteadyPool = FixedPool<DualQueue>;

#[cfg(test)]
mod tests {
    use super::*;

    fn drain_count(q: &DualQueue, buffer: &mut VecDeque<Task>) -> usize {
        let mut n = 0;
        while q.pull(buffer).is_some() {
            n += 1;
        }
        n
    }

    #[test]
    fn pull_swaps_public_into_buffer() {
        let q = DualQueue::new();
        let mut buffer = VecDeque::new();

        for _ in 0..3 {
            q.try_push(Task::new(|| {}), 0).unwrap();
        }
        assert_eq!(q.depth(), 3);

        // First pull swaps; the remaining two sit in the buffer.
        assert!(q.pull(&mut buffer).is_some());
        assert_eq!(buffer.len(), 2);
        assert!(q.public.lock().is_empty());

        assert_eq!(drain_count(&q, &mut buffer), 2);
        assert_eq!(q.depth(), 0);
        assert!(q.pull(&mut buffer).is_none());
    }

    #[test]
    fn capacity_counts_buffer_and_public_together() {
        let q = DualQueue::new();
        let mut buffer = VecDeque::new();

        q.try_push(Task::new(|| {}), 2).unwrap();
        q.try_push(Task::new(|| {}), 2).unwrap();
        assert!(q.try_push(Task::new(|| {}), 2).is_err());

        // Swap into the buffer; combined depth is unchanged, so the queue is
        // still full.
        assert!(q.pull(&mut buffer).is_some());
        assert_eq!(buffer.len(), 1);
        assert!(q.try_push(Task::new(|| {}), 2).is_ok());
        assert!(q.try_push(Task::new(|| {}), 2).is_err());
    }

    #[test]
    fn batch_lands_in_push_order() {
        let q = DualQueue::new();
        let mut buffer = VecDeque::new();

        let order = std::sync::Arc::new(SpinLock::new(Vec::new()));
        let tasks: Vec<Task> = (0..5)
            .map(|i| {
                let order = std::sync::Arc::clone(&order);
                Task::new(move || order.lock().push(i))
            })
            .collect();
        q.push_batch(tasks);
        assert_eq!(q.depth(), 5);

        while let Some(task) = q.pull(&mut buffer) {
            task.invoke();
        }
        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    }
}
