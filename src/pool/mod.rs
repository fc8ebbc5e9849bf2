//! Task pools: dispatch, worker execution, and lifecycle.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                     TaskPool                         │
//!   producers ───►│ submit / submit_with_handle / submit_batch           │
//!                 └───────────────┬──────────────────────┬───────────────┘
//!                                 │ fixed pools          │ dynamic pool
//!                                 ▼                      ▼
//!                 ┌───────────────────────────┐  ┌───────────────────────┐
//!                 │ admission → DispatchCursor│  │  one shared queue     │
//!                 │   Steady: public ⇄ buffer │  │  (Mutex + Condvar)    │
//!                 │   Balanced: locked deque  │  │  add / del / adjust   │
//!                 └───────────────────────────┘  └───────────────────────┘
//! ```
//!
//! # Module map
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`task`] | Move-only type-erased unit of work |
//! | [`handle`] | Result handles for submit-with-return |
//! | [`error`] | Caller-surfaced submission and lifecycle failures |
//! | [`overflow`] | Bounded-pool overflow policies |
//! | [`balancer`] | Cursor-scan destination selection (fixed pools) |
//! | [`fixed`] | Shared fixed-width engine and the `QueueFlavor` seam |
//! | [`steady`] | Dual-queue flavor: swap-amortized locking |
//! | [`balanced`] | Single-queue flavor: one locked deque per worker |
//! | [`dynamic`] | Elastic pool with runtime thread-count mutation |
//! | `gate` | Pool-wide wait/notify gate (internal) |
//!
//! # Ordering guarantees
//!
//! | Pool | Within one worker queue | Across workers |
//! |------|------------------------|----------------|
//! | Steady | FIFO | none (balancer splits the stream) |
//! | Balanced | FIFO | none |
//! | Dynamic | n/a (one shared queue) | global FIFO across all submissions |
//!
//! # Contract
//!
//! - Task bodies must not panic: the library neither catches nor propagates;
//!   a panicking task costs the pool that worker thread.
//! - `wait_for_tasks` from inside a task of the same pool self-deadlocks and
//!   is forbidden (no detection is attempted).
//! - Submission is many-producer-safe. Lifecycle operations serialize
//!   internally; they are cheap but not meant for hot paths.

pub mod balancer;
pub mod balanced;
pub mod dynamic;
pub mod error;
pub mod fixed;
pub(crate) mod gate;
pub mod handle;
pub mod overflow;
pub mod steady;
pub mod task;

pub use balanced::{BalancedPool, SingleQueue};
pub use dynamic::{DynamicPool, Throughput};
pub use error::{LifecycleError, SubmitError};
pub use fixed::{FixedPool, FixedPoolConfig, QueueFlavor};
pub use handle::TaskHandle;
pub use overflow::{OverflowCallback, OverflowPolicy};
pub use steady::{DualQueue, SteadyPool};
pub use task::Task;

use handle::result_channel;

/// Uniform submission and introspection surface over the three pool shapes.
///
/// The provided methods wrap plain closures into [`Task`] values; the
/// required methods are the per-pool admission paths.
pub trait TaskPool {
    /// Submits one already-wrapped task.
    fn submit_task(&self, task: Task) -> Result<(), SubmitError>;

    /// Submits a batch of already-wrapped tasks. On an unbounded fixed pool
    /// the whole batch lands on one worker under a single lock acquisition;
    /// bounded pools admit task-by-task under the overflow policy.
    fn submit_task_batch(&self, tasks: Vec<Task>) -> Result<(), SubmitError>;

    /// Worker threads currently attached to the pool.
    fn thread_count(&self) -> usize;

    /// Admitted tasks whose bodies have not yet returned.
    fn tasks_loaded(&self) -> usize;

    /// Tasks admitted over the pool's lifetime.
    fn tasks_submitted(&self) -> u64;

    /// True once `close` has begun.
    fn is_closed(&self) -> bool;

    /// Blocks until the pool is quiescent: no loaded task and every worker
    /// idle.
    fn wait_for_tasks(&self);

    /// Refuses new submissions, drains already-enqueued work, and joins the
    /// workers. Idempotent.
    fn close(&self);

    /// Tasks that have finished executing.
    fn tasks_completed(&self) -> u64 {
        self.tasks_submitted()
            .saturating_sub(self.tasks_loaded() as u64)
    }

    /// Wraps a closure and submits it.
    fn submit<F>(&self, f: F) -> Result<(), SubmitError>
    where
        F: FnOnce() + Send + 'static,
        Self: Sized,
    {
        self.submit_task(Task::new(f))
    }

    /// Submits a value-returning closure; the result is delivered through
    /// the returned handle. The pool itself never sees the value.
    fn submit_with_handle<T, F>(&self, f: F) -> Result<TaskHandle<T>, SubmitError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
        Self: Sized,
    {
        let (promise, handle) = result_channel();
        self.submit_task(Task::new(move || promise.fulfill(f())))?;
        Ok(handle)
    }

    /// Wraps a homogeneous batch of closures and submits it as one batch.
    fn submit_batch<F, I>(&self, tasks: I) -> Result<(), SubmitError>
    where
        F: FnOnce() + Send + 'static,
        I: IntoIterator<Item = F>,
        Self: Sized,
    {
        self.submit_task_batch(tasks.into_iter().map(Task::new).collect())
    }
}
