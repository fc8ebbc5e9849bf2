//! High-throughput in-process thread pools.
//!
//! Three pool shapes share one submission contract and differ in how tasks
//! reach workers:
//!
//! - [`SteadyPool`]: fixed width; each worker owns a *public* queue that
//!   producers fill under a spinlock and a *private* buffer the worker swaps
//!   it into, so one lock acquisition drains a whole burst. Highest
//!   throughput on streams of small tasks.
//! - [`BalancedPool`]: fixed width; each worker owns a single locked deque,
//!   keeping every queued task reachable for placement decisions until the
//!   moment it runs. Flattest latency under uneven load.
//! - [`DynamicPool`]: elastic; all workers share one queue, giving global
//!   FIFO across submissions plus runtime thread-count mutation
//!   (`add`/`del`/`adjust`) and dead-worker reaping.
//!
//! ```
//! use taskpool_rs::{SteadyPool, TaskPool};
//!
//! let pool = SteadyPool::new(8);
//!
//! pool.submit(|| { /* fire and forget */ }).unwrap();
//!
//! let doubled = pool.submit_with_handle(|| 21 * 2).unwrap();
//! assert_eq!(doubled.join(), 42);
//!
//! pool.wait_for_tasks();
//! pool.close();
//! ```
//!
//! # Guarantees
//!
//! - An admitted task runs exactly once; a refused task is returned to the
//!   caller (reject), retried after blocking (block), or handed exactly
//!   once to the overflow callback. No task silently disappears.
//! - Fixed pools execute per-worker queues in FIFO order; the dynamic pool
//!   is globally FIFO.
//! - `close` drains already-enqueued work before returning and is
//!   idempotent; dropping a pool closes it.
//!
//! # Contract
//!
//! Task bodies must not panic (the panicking worker thread is lost), and
//! `wait_for_tasks` must not be called from inside a task of the same pool
//! (self-deadlock by construction). See [`pool`] for the full contract.
//!
//! # No global state
//!
//! Every pool is a self-contained object; the only environment probe is the
//! hardware-concurrency count, used to pick the spin-wait strategy.

pub mod pool;
pub mod stdx;

// Pools and the submission façade.
pub use pool::{BalancedPool, DynamicPool, FixedPool, SteadyPool, TaskPool};

// Configuration and admission control.
pub use pool::{FixedPoolConfig, OverflowCallback, OverflowPolicy};

// Work and result types.
pub use pool::{Task, TaskHandle};

// Failures and observability.
pub use pool::{LifecycleError, SubmitError, Throughput};
