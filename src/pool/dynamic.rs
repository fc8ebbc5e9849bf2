//! Elastic pool over a single shared queue.
//!
//! All producers append to one `Mutex<VecDeque>` and all workers pop from
//! it, which buys the one guarantee the fixed pools cannot give: global FIFO
//! across every submission. The worker set mutates at runtime: `add` spawns
//! workers that begin polling immediately, `del` marks live workers for
//! shutdown without waiting, `adjust` normalizes to either. Exited workers
//! park their OS thread handles in their registry slot until [`join_dead`]
//! reaps them.
//!
//! Lifecycle operations (`add`, `del`, `adjust`, `join_dead`, `close`)
//! serialize on the registry mutex; submissions stay many-producer-safe and
//! never touch it.
//!
//! [`join_dead`]: DynamicPool::join_dead

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::error::{LifecycleError, SubmitError};
use super::gate::SyncGate;
use super::task::Task;
use super::TaskPool;

// ============================================================================
// Shared state
// ============================================================================

/// Per-worker lifecycle flags, shared between the worker thread and the
/// registry.
struct WorkerState {
    /// Cleared to request termination. A worker observing `false` exits
    /// without popping further tasks, leaving queued work to survivors.
    running: AtomicBool,
    /// Set by the worker on its way out; the slot is then reapable.
    exited: AtomicBool,
}

struct DynShared {
    queue: Mutex<VecDeque<Task>>,
    /// Workers sleep here while the queue is empty.
    task_ready: Condvar,

    submitted: AtomicU64,
    loaded: AtomicUsize,
    stop: AtomicBool,

    /// Live (spawned, not yet exited) workers.
    running_count: AtomicUsize,
    /// Workers currently blocked waiting for a task.
    waiting_count: AtomicUsize,
    /// Declared target thread count; `running_count` converges toward it.
    expected: AtomicUsize,

    gate: SyncGate,
}

struct WorkerSlot {
    state: Arc<WorkerState>,
    handle: Option<JoinHandle<()>>,
}

struct Registry {
    slots: Vec<WorkerSlot>,
    next_id: usize,
    closed: bool,
}

// ============================================================================
// DynamicPool
// ============================================================================

/// Elastic task pool with runtime thread-count mutation and global FIFO
/// execution order.
///
/// ```
/// use taskpool_rs::{DynamicPool, TaskPool};
///
/// let pool = DynamicPool::new(4);
/// pool.add(4).unwrap();
/// pool.wait_for_threads();
/// assert_eq!(pool.running_count(), 8);
/// pool.close();
/// ```
pub struct DynamicPool {
    shared: Arc<DynShared>,
    registry: Mutex<Registry>,
}

impl DynamicPool {
    /// Creates a pool with `initial_threads` workers polling one shared
    /// queue. Zero is allowed: tasks then queue up until `add` supplies
    /// workers.
    pub fn new(initial_threads: usize) -> Self {
        let pool = Self {
            shared: Arc::new(DynShared {
                queue: Mutex::new(VecDeque::new()),
                task_ready: Condvar::new(),
                submitted: AtomicU64::new(0),
                loaded: AtomicUsize::new(0),
                stop: AtomicBool::new(false),
                running_count: AtomicUsize::new(0),
                waiting_count: AtomicUsize::new(0),
                expected: AtomicUsize::new(0),
                gate: SyncGate::new(),
            }),
            registry: Mutex::new(Registry {
                slots: Vec::new(),
                next_id: 0,
                closed: false,
            }),
        };
        if initial_threads > 0 {
            pool.add(initial_threads)
                .expect("fresh pool cannot be closed");
        }
        pool
    }

    /// Spawns `k` additional workers; they begin polling immediately.
    pub fn add(&self, k: usize) -> Result<(), LifecycleError> {
        let mut registry = self.registry.lock().unwrap();
        if registry.closed {
            return Err(LifecycleError::Closed);
        }
        self.shared.expected.fetch_add(k, Ordering::SeqCst);
        for _ in 0..k {
            spawn_worker(&mut registry, &self.shared);
        }
        Ok(())
    }

    /// Marks up to `k` live workers for shutdown and returns without
    /// waiting. Marked workers finish the task they have popped (if any) and
    /// exit; queued tasks remain for survivors. `k` larger than the live
    /// count deletes all.
    pub fn del(&self, k: usize) -> Result<(), LifecycleError> {
        let registry = self.registry.lock().unwrap();
        if registry.closed {
            return Err(LifecycleError::Closed);
        }
        del_locked(&registry, &self.shared, k);
        Ok(())
    }

    /// Adds or deletes workers so that `expected_count` becomes `target`.
    pub fn adjust(&self, target: usize) -> Result<(), LifecycleError> {
        let mut registry = self.registry.lock().unwrap();
        if registry.closed {
            return Err(LifecycleError::Closed);
        }
        let expected = self.shared.expected.load(Ordering::SeqCst);
        if target > expected {
            let k = target - expected;
            self.shared.expected.fetch_add(k, Ordering::SeqCst);
            for _ in 0..k {
                spawn_worker(&mut registry, &self.shared);
            }
        } else if target < expected {
            del_locked(&registry, &self.shared, expected - target);
        }
        Ok(())
    }

    /// Joins the OS threads of workers that have exited, freeing their
    /// slots. Returns how many were reaped.
    pub fn join_dead(&self) -> usize {
        let mut registry = self.registry.lock().unwrap();
        let mut reaped = 0;
        registry.slots.retain_mut(|slot| {
            if slot.state.exited.load(Ordering::SeqCst) {
                if let Some(handle) = slot.handle.take() {
                    let _ = handle.join();
                }
                reaped += 1;
                false
            } else {
                true
            }
        });
        reaped
    }

    /// Blocks until `running_count` matches `expected_count`.
    pub fn wait_for_threads(&self) {
        let shared = &self.shared;
        shared.gate.wait_until(|| {
            shared.running_count.load(Ordering::SeqCst) == shared.expected.load(Ordering::SeqCst)
        });
    }

    /// Live workers right now.
    pub fn running_count(&self) -> usize {
        self.shared.running_count.load(Ordering::SeqCst)
    }

    /// Declared target thread count.
    pub fn expected_count(&self) -> usize {
        self.shared.expected.load(Ordering::SeqCst)
    }

    /// Tasks sitting in the shared queue, not yet popped.
    pub fn queue_depth(&self) -> usize {
        self.shared.queue.lock().unwrap().len()
    }

    /// Samples task completion over `interval` by differencing two reads of
    /// the completed-task counter. Purely observational; the pool never
    /// reacts to it.
    pub fn sample_throughput(&self, interval: Duration) -> Throughput {
        let before = self.tasks_completed();
        thread::sleep(interval);
        let after = self.tasks_completed();
        Throughput {
            completed: after.saturating_sub(before),
            interval,
        }
    }
}

impl TaskPool for DynamicPool {
    fn submit_task(&self, task: Task) -> Result<(), SubmitError> {
        let shared = &self.shared;
        let mut queue = shared.queue.lock().unwrap();
        if shared.stop.load(Ordering::Acquire) {
            return Err(SubmitError::Closed { tasks: vec![task] });
        }
        shared.loaded.fetch_add(1, Ordering::SeqCst);
        shared.submitted.fetch_add(1, Ordering::Relaxed);
        queue.push_back(task);
        shared.task_ready.notify_one();
        Ok(())
    }

    fn submit_task_batch(&self, tasks: Vec<Task>) -> Result<(), SubmitError> {
        if tasks.is_empty() {
            return Ok(());
        }
        let shared = &self.shared;
        let mut queue = shared.queue.lock().unwrap();
        if shared.stop.load(Ordering::Acquire) {
            return Err(SubmitError::Closed { tasks });
        }
        let n = tasks.len();
        shared.loaded.fetch_add(n, Ordering::SeqCst);
        shared.submitted.fetch_add(n as u64, Ordering::Relaxed);
        queue.extend(tasks);
        shared.task_ready.notify_all();
        Ok(())
    }

    fn thread_count(&self) -> usize {
        self.running_count()
    }

    fn tasks_loaded(&self) -> usize {
        self.shared.loaded.load(Ordering::Acquire)
    }

    fn tasks_submitted(&self) -> u64 {
        self.shared.submitted.load(Ordering::Relaxed)
    }

    fn is_closed(&self) -> bool {
        self.shared.stop.load(Ordering::Acquire)
    }

    /// Blocks until no admitted task remains and every live worker is
    /// waiting on the queue. Forbidden from inside a task of this pool
    /// (self-deadlock).
    fn wait_for_tasks(&self) {
        let shared = &self.shared;
        shared.gate.wait_until(|| {
            shared.loaded.load(Ordering::SeqCst) == 0
                && shared.waiting_count.load(Ordering::SeqCst)
                    == shared.running_count.load(Ordering::SeqCst)
        });
    }

    /// Refuses new submissions, drains already-enqueued tasks (when any
    /// worker is alive to run them), then stops and joins every worker.
    /// Idempotent; terminal.
    fn close(&self) {
        let mut registry = self.registry.lock().unwrap();
        if registry.closed {
            return;
        }
        let shared = &self.shared;
        shared.stop.store(true, Ordering::Release);

        // Drain-on-close. If every worker is already gone the queue cannot
        // drain; those tasks are the documented closed-with-nonempty-queue
        // loss and are discarded below.
        shared
            .gate
            .wait_until(|| {
                shared.loaded.load(Ordering::SeqCst) == 0
                    || shared.running_count.load(Ordering::SeqCst) == 0
            });
        {
            let mut queue = shared.queue.lock().unwrap();
            let discarded = queue.len();
            queue.clear();
            if discarded > 0 {
                shared.loaded.fetch_sub(discarded, Ordering::SeqCst);
            }
        }

        for slot in &registry.slots {
            slot.state.running.store(false, Ordering::SeqCst);
        }
        {
            let _queue = shared.queue.lock().unwrap();
            shared.task_ready.notify_all();
        }
        for slot in registry.slots.iter_mut() {
            if let Some(handle) = slot.handle.take() {
                let _ = handle.join();
            }
        }
        registry.slots.clear();
        registry.closed = true;
        // Terminal state: no workers will ever run again.
        shared.expected.store(0, Ordering::SeqCst);
        shared.gate.notify_waiters();
    }
}

impl Drop for DynamicPool {
    fn drop(&mut self) {
        self.close();
    }
}

impl core::fmt::Debug for DynamicPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DynamicPool")
            .field("running", &self.running_count())
            .field("expected", &self.expected_count())
            .field("tasks_loaded", &self.tasks_loaded())
            .field("tasks_submitted", &self.tasks_submitted())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Completed-task delta over a sampling interval.
#[derive(Clone, Copy, Debug)]
pub struct Throughput {
    /// Tasks completed during the interval.
    pub completed: u64,
    /// The sampling interval.
    pub interval: Duration,
}

impl Throughput {
    /// Completion rate in tasks per second.
    pub fn per_sec(&self) -> f64 {
        let secs = self.interval.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.completed as f64 / secs
    }
}

// ============================================================================
// Worker lifecycle
// ============================================================================

fn spawn_worker(registry: &mut Registry, shared: &Arc<DynShared>) {
    let id = registry.next_id;
    registry.next_id += 1;

    let state = Arc::new(WorkerState {
        running: AtomicBool::new(true),
        exited: AtomicBool::new(false),
    });

    let thread_state = Arc::clone(&state);
    let thread_shared = Arc::clone(shared);
    let handle = thread::Builder::new()
        .name(format!("dyn-worker-{id}"))
        .spawn(move || worker_loop(&thread_shared, &thread_state))
        .expect("failed to spawn worker thread");

    registry.slots.push(WorkerSlot {
        state,
        handle: Some(handle),
    });
}

fn del_locked(registry: &Registry, shared: &DynShared, k: usize) {
    let expected = shared.expected.load(Ordering::SeqCst);
    shared
        .expected
        .store(expected.saturating_sub(k), Ordering::SeqCst);

    let mut remaining = k;
    for slot in &registry.slots {
        if remaining == 0 {
            break;
        }
        if !slot.state.exited.load(Ordering::SeqCst)
            && slot.state.running.swap(false, Ordering::SeqCst)
        {
            remaining -= 1;
        }
    }

    // Wake sleepers so marked workers observe the cleared flag.
    let _queue = shared.queue.lock().unwrap();
    shared.task_ready.notify_all();
}

/// Shared-queue worker loop.
///
/// State machine: spawned → polling → (running_task | waiting) → polling …
/// → exited. The running flag is checked before every pop, so a `del`-marked
/// worker never takes another task.
fn worker_loop(shared: &DynShared, state: &WorkerState) {
    shared.running_count.fetch_add(1, Ordering::SeqCst);
    shared.gate.notify_waiters();

    'outer: loop {
        let task = {
            let mut queue = shared.queue.lock().unwrap();
            loop {
                if !state.running.load(Ordering::Acquire) {
                    break 'outer;
                }
                if let Some(task) = queue.pop_front() {
                    break task;
                }
                shared.waiting_count.fetch_add(1, Ordering::SeqCst);
                shared.gate.notify_waiters();
                queue = shared.task_ready.wait(queue).unwrap();
                shared.waiting_count.fetch_sub(1, Ordering::SeqCst);
            }
        };

        task.invoke();
        if shared.loaded.fetch_sub(1, Ordering::SeqCst) == 1 {
            shared.gate.notify_waiters();
        }
    }

    state.exited.store(true, Ordering::SeqCst);
    shared.running_count.fetch_sub(1, Ordering::SeqCst);
    shared.gate.notify_waiters();
}
