//! Shared engine for the two fixed-width pools.
//!
//! # Architecture
//!
//! ```text
//!   producers ──► submit ──► admission ──► DispatchCursor ──► worker queue
//!                              │                                  │
//!                              │ bounded + full                   ▼
//!                              ▼                           worker thread:
//!                       OverflowPolicy                     pull → invoke
//!                    (reject/block/callback)               park when empty
//! ```
//!
//! [`FixedPool`] owns everything both fixed pools share: construction of N
//! workers, the cursor-scan load balancer, capacity admission with the
//! overflow policy, single-lock batch placement, `wait_for_tasks`, and
//! drain-on-close. The two pool variants differ only in how a worker's queue
//! admits and hands out tasks, which is the [`QueueFlavor`] seam: the steady
//! pool plugs in a swap-drained dual queue, the balanced pool a single
//! locked deque.
//!
//! # Correctness invariants
//!
//! - An admitted task is invoked exactly once: `loaded` is raised before the
//!   task becomes visible to a worker and lowered only after its body
//!   returns.
//! - Admission and close handshake through `loaded` and `stop` (both
//!   SeqCst): a producer raises `loaded`, then re-checks `stop` before
//!   pushing; `close()` sets `stop`, then waits for `loaded == 0` before
//!   stopping any worker. Either the drain observes the producer's
//!   increment and waits for the task to run, or the producer observes
//!   `stop` and backs out without pushing. A task can never land in a queue
//!   whose worker has exited.
//! - Per-queue FIFO: a worker invokes its queue's tasks in push order. There
//!   is no cross-worker order; the balancer splits the stream.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_utils::sync::{Parker, Unparker};

use super::balancer::{CandidateLoad, DispatchCursor};
use super::error::SubmitError;
use super::gate::SyncGate;
use super::overflow::OverflowPolicy;
use super::task::Task;
use super::TaskPool;

// ============================================================================
// QueueFlavor (the seam between the two fixed pools)
// ============================================================================

/// Worker-side queueing discipline of a fixed pool.
///
/// One value lives per worker and is shared between that worker and every
/// producer. `Local` is worker-thread-private state (the steady pool's
/// execution buffer); it never crosses threads.
pub trait QueueFlavor: Send + Sync + 'static {
    /// Worker-private pull state.
    type Local: Default + Send;

    fn new() -> Self;

    /// Tasks currently awaiting execution in this queue (atomic snapshot;
    /// may be stale by the time the caller acts on it).
    fn depth(&self) -> usize;

    /// Admits one task, or returns it when `capacity` is nonzero and the
    /// queue is full. The capacity check and the push happen under the
    /// queue's own lock.
    fn try_push(&self, task: Task, capacity: usize) -> Result<(), Task>;

    /// Admits a whole batch under a single lock acquisition. Only called on
    /// unbounded pools.
    fn push_batch(&self, tasks: Vec<Task>);

    /// Hands out the next task in push order, or `None` when the queue is
    /// observed empty. Called only by the owning worker.
    fn pull(&self, local: &mut Self::Local) -> Option<Task>;
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for a fixed-width pool.
#[derive(Clone, Debug)]
pub struct FixedPoolConfig {
    /// Number of worker threads. Must be nonzero.
    pub threads: usize,

    /// Per-worker queue capacity in tasks; 0 means unbounded.
    pub capacity: usize,

    /// What to do with tasks a bounded queue cannot admit. Ignored when
    /// `capacity == 0`.
    pub overflow: OverflowPolicy,
}

impl FixedPoolConfig {
    /// Validates the configuration. Panics on invalid values.
    pub fn validate(&self) {
        assert!(self.threads > 0, "threads must be > 0");
    }
}

impl Default for FixedPoolConfig {
    fn default() -> Self {
        Self {
            threads: num_cpus::get().max(1),
            capacity: 0,
            overflow: OverflowPolicy::default(),
        }
    }
}

// ============================================================================
// Shared state
// ============================================================================

/// Per-worker record shared between the worker thread and producers.
struct WorkerShared<Q> {
    queue: Q,
    /// Cleared to request termination.
    running: AtomicBool,
    /// Worker self-reports idleness here; read by the balancer and
    /// `wait_for_tasks`.
    waiting: AtomicBool,
    unparker: Unparker,
}

struct FixedInner<Q> {
    workers: Vec<WorkerShared<Q>>,
    cursor: DispatchCursor,
    capacity: usize,
    overflow: OverflowPolicy,

    /// Tasks admitted over the pool's lifetime.
    submitted: AtomicU64,
    /// Admitted tasks whose bodies have not yet returned.
    loaded: AtomicUsize,
    /// Once set, submissions are refused with `SubmitError::Closed`.
    stop: AtomicBool,

    gate: SyncGate,
}

/// Why an admission attempt did not place its task.
enum AdmitRefused {
    /// Destination queue at capacity; the overflow policy decides next.
    Full(Task),
    /// The pool has started closing; admission is sealed.
    Closed(Task),
}

impl<Q: QueueFlavor> FixedInner<Q> {
    fn probe(&self, idx: usize) -> CandidateLoad {
        let w = &self.workers[idx];
        CandidateLoad {
            waiting: w.waiting.load(Ordering::Relaxed),
            depth: w.queue.depth(),
        }
    }

    /// Undoes a speculative `loaded` increment that will not become a push.
    fn back_out(&self, n: usize) {
        if self.loaded.fetch_sub(n, Ordering::SeqCst) == n {
            // A closing thread may be drain-waiting on this exact count.
            self.gate.notify_waiters();
        }
    }

    /// One admission attempt against the balancer's chosen worker.
    ///
    /// The order here pairs with `close()`: `loaded` is raised *before*
    /// `stop` is re-checked, and close sets `stop` before drain-waiting on
    /// `loaded == 0`. Whichever side loses the race, the task is either
    /// counted (and close waits for it to run) or never pushed.
    fn admit_once(&self, task: Task) -> Result<(), AdmitRefused> {
        let idx = self.cursor.pick(self.workers.len(), |i| self.probe(i));
        // Raise `loaded` before the push: the worker may pull and finish the
        // task before this thread runs another instruction.
        self.loaded.fetch_add(1, Ordering::SeqCst);
        if self.stop.load(Ordering::SeqCst) {
            self.back_out(1);
            return Err(AdmitRefused::Closed(task));
        }
        match self.workers[idx].queue.try_push(task, self.capacity) {
            Ok(()) => {
                self.submitted.fetch_add(1, Ordering::Relaxed);
                self.workers[idx].unparker.unpark();
                Ok(())
            }
            Err(task) => {
                self.back_out(1);
                Err(AdmitRefused::Full(task))
            }
        }
    }

    /// Blocking admission for the block-until-fit policy. Returns the task
    /// when the pool closes before space appears.
    fn admit_blocking(&self, mut task: Task) -> Result<(), Task> {
        loop {
            match self.admit_once(task) {
                Ok(()) => return Ok(()),
                Err(AdmitRefused::Closed(t)) => return Err(t),
                Err(AdmitRefused::Full(t)) => task = t,
            }
            self.gate.wait_until(|| {
                self.stop.load(Ordering::SeqCst)
                    || self.workers.iter().any(|w| w.queue.depth() < self.capacity)
            });
            if self.stop.load(Ordering::SeqCst) {
                return Err(task);
            }
        }
    }
}

// ============================================================================
// FixedPool
// ============================================================================

/// Fixed-width task pool, generic over the worker queue flavor.
///
/// See [`SteadyPool`](super::SteadyPool) and
/// [`BalancedPool`](super::BalancedPool) for the two concrete shapes.
pub struct FixedPool<Q: QueueFlavor> {
    inner: Arc<FixedInner<Q>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<Q: QueueFlavor> FixedPool<Q> {
    /// Creates an unbounded pool with `threads` workers.
    pub fn new(threads: usize) -> Self {
        Self::with_config(FixedPoolConfig {
            threads,
            ..FixedPoolConfig::default()
        })
    }

    /// Creates a pool from a full configuration.
    pub fn with_config(config: FixedPoolConfig) -> Self {
        config.validate();

        let mut parkers = Vec::with_capacity(config.threads);
        let mut workers = Vec::with_capacity(config.threads);
        for _ in 0..config.threads {
            let parker = Parker::new();
            workers.push(WorkerShared {
                queue: Q::new(),
                running: AtomicBool::new(true),
                waiting: AtomicBool::new(false),
                unparker: parker.unparker().clone(),
            });
            parkers.push(parker);
        }

        let inner = Arc::new(FixedInner {
            workers,
            cursor: DispatchCursor::new(),
            capacity: config.capacity,
            overflow: config.overflow,
            submitted: AtomicU64::new(0),
            loaded: AtomicUsize::new(0),
            stop: AtomicBool::new(false),
            gate: SyncGate::new(),
        });

        let mut handles = Vec::with_capacity(config.threads);
        for (idx, parker) in parkers.into_iter().enumerate() {
            let inner = Arc::clone(&inner);
            let handle = thread::Builder::new()
                .name(format!("pool-worker-{idx}"))
                .spawn(move || worker_loop(&inner, idx, parker))
                .expect("failed to spawn worker thread");
            handles.push(handle);
        }

        Self {
            inner,
            handles: Mutex::new(handles),
        }
    }
}

impl<Q: QueueFlavor> TaskPool for FixedPool<Q> {
    fn submit_task(&self, task: Task) -> Result<(), SubmitError> {
        let inner = &self.inner;
        let task = match inner.admit_once(task) {
            Ok(()) => return Ok(()),
            Err(AdmitRefused::Closed(task)) => {
                return Err(SubmitError::Closed { tasks: vec![task] })
            }
            Err(AdmitRefused::Full(task)) => task,
        };

        // Bounded and full at the chosen destination: the overflow policy
        // decides. (`admit_once` cannot fail on an unbounded pool.)
        match &inner.overflow {
            OverflowPolicy::Reject => Err(SubmitError::Refused {
                tasks: vec![task],
                capacity: inner.capacity,
            }),
            OverflowPolicy::Callback(cb) => {
                (cb.as_ref())(vec![task]);
                Ok(())
            }
            OverflowPolicy::Block => inner
                .admit_blocking(task)
                .map_err(|task| SubmitError::Closed { tasks: vec![task] }),
        }
    }

    fn submit_task_batch(&self, tasks: Vec<Task>) -> Result<(), SubmitError> {
        if tasks.is_empty() {
            return Ok(());
        }
        let inner = &self.inner;

        if inner.capacity == 0 {
            // Whole batch to one destination under a single lock
            // acquisition; this is the fixed pools' batch fast path. The
            // increment-then-recheck handshake is the same as admit_once's,
            // applied to the batch as a unit.
            let n = tasks.len();
            let idx = inner.cursor.pick(inner.workers.len(), |i| inner.probe(i));
            inner.loaded.fetch_add(n, Ordering::SeqCst);
            if inner.stop.load(Ordering::SeqCst) {
                inner.back_out(n);
                return Err(SubmitError::Closed { tasks });
            }
            inner.submitted.fetch_add(n as u64, Ordering::Relaxed);
            inner.workers[idx].queue.push_batch(tasks);
            inner.workers[idx].unparker.unpark();
            return Ok(());
        }

        // Bounded: capacity is honored one task at a time.
        let mut iter = tasks.into_iter();
        let mut called_back = Vec::new();
        while let Some(task) = iter.next() {
            let task = match inner.admit_once(task) {
                Ok(()) => continue,
                Err(AdmitRefused::Closed(task)) => {
                    // Tasks already refused for capacity still go to the
                    // callback exactly once before the closed tail is
                    // returned.
                    if !called_back.is_empty() {
                        if let OverflowPolicy::Callback(cb) = &inner.overflow {
                            (cb.as_ref())(core::mem::take(&mut called_back));
                        }
                    }
                    let mut rejected = vec![task];
                    rejected.extend(iter);
                    return Err(SubmitError::Closed { tasks: rejected });
                }
                Err(AdmitRefused::Full(task)) => task,
            };
            match &inner.overflow {
                OverflowPolicy::Reject => {
                    let mut refused = vec![task];
                    refused.extend(iter);
                    return Err(SubmitError::Refused {
                        tasks: refused,
                        capacity: inner.capacity,
                    });
                }
                OverflowPolicy::Callback(_) => called_back.push(task),
                OverflowPolicy::Block => {
                    if let Err(task) = inner.admit_blocking(task) {
                        let mut rejected = vec![task];
                        rejected.extend(iter);
                        return Err(SubmitError::Closed { tasks: rejected });
                    }
                }
            }
        }
        if !called_back.is_empty() {
            if let OverflowPolicy::Callback(cb) = &inner.overflow {
                (cb.as_ref())(called_back);
            }
        }
        Ok(())
    }

    fn thread_count(&self) -> usize {
        self.inner.workers.len()
    }

    fn tasks_loaded(&self) -> usize {
        self.inner.loaded.load(Ordering::Acquire)
    }

    fn tasks_submitted(&self) -> u64 {
        self.inner.submitted.load(Ordering::Relaxed)
    }

    fn is_closed(&self) -> bool {
        self.inner.stop.load(Ordering::Acquire)
    }

    /// Blocks until no admitted task remains and every worker reports idle.
    ///
    /// Calling this from inside a task of the same pool deadlocks by
    /// construction; that usage is forbidden and not detected.
    fn wait_for_tasks(&self) {
        let inner = &self.inner;
        inner.gate.wait_until(|| {
            inner.loaded.load(Ordering::SeqCst) == 0
                && inner.workers.iter().all(|w| w.waiting.load(Ordering::SeqCst))
        });
    }

    fn close(&self) {
        let mut handles = self.handles.lock().unwrap();
        if handles.is_empty() {
            // Already closed.
            return;
        }
        let inner = &self.inner;

        inner.stop.store(true, Ordering::SeqCst);
        // Release producers blocked on admission so they observe the stop.
        inner.gate.notify_waiters();

        // Drain before stopping anyone. `stop` is ordered before this wait,
        // so a producer whose task is not yet counted in `loaded` observes
        // `stop` and backs out (see admit_once); a task already counted is
        // executed by the still-running workers before the wait returns.
        inner
            .gate
            .wait_until(|| inner.loaded.load(Ordering::SeqCst) == 0);

        for w in &inner.workers {
            w.running.store(false, Ordering::SeqCst);
            w.unparker.unpark();
        }
        for handle in handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl<Q: QueueFlavor> Drop for FixedPool<Q> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<Q: QueueFlavor> core::fmt::Debug for FixedPool<Q> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FixedPool")
            .field("threads", &self.thread_count())
            .field("capacity", &self.inner.capacity)
            .field("tasks_loaded", &self.tasks_loaded())
            .field("tasks_submitted", &self.tasks_submitted())
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ============================================================================
// Worker loop
// ============================================================================

/// Per-thread execution loop shared by both fixed pool variants.
///
/// ```text
///   pull ──some──► invoke ──► loaded-- ──► loop
///    │
///    none: waiting = true
///          depth > 0 ────────────────────► retry   (push raced the check)
///          !running && drained ──────────► exit
///          park, waiting = false ────────► loop
/// ```
///
/// Exit requires both a cleared `running` flag and an empty queue. `close()`
/// seals admission and waits for the pool to drain before clearing any
/// `running` flag, so the exit path normally finds the queue already empty;
/// the depth re-check also guards the push/park race during normal
/// operation.
fn worker_loop<Q: QueueFlavor>(inner: &FixedInner<Q>, idx: usize, parker: Parker) {
    let me = &inner.workers[idx];
    let mut local = Q::Local::default();

    loop {
        match me.queue.pull(&mut local) {
            Some(task) => {
                // A queue slot was freed; bounded producers may be waiting
                // on it. No-op unless someone is blocked.
                inner.gate.notify_waiters();

                task.invoke();

                if inner.loaded.fetch_sub(1, Ordering::SeqCst) == 1 {
                    inner.gate.notify_waiters();
                }
            }
            None => {
                me.waiting.store(true, Ordering::SeqCst);

                // A producer may have pushed between the failed pull and the
                // flag store; re-check before committing to park.
                if me.queue.depth() > 0 {
                    me.waiting.store(false, Ordering::SeqCst);
                    continue;
                }
                if !me.running.load(Ordering::SeqCst) {
                    // Queue drained and termination requested. `waiting`
                    // stays set so wait_for_tasks on a closed pool returns.
                    inner.gate.notify_waiters();
                    break;
                }

                inner.gate.notify_waiters();
                parker.park();
                me.waiting.store(false, Ordering::SeqCst);
            }
        }
    }
}
