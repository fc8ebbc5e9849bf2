//! Result handles for submit-with-return.
//!
//! The pool itself never sees return values: `submit_with_handle` wraps the
//! caller's closure so the result lands in a shared slot, and hands back a
//! [`TaskHandle`] the producer can block on. One slot, one writer, one
//! reader.

use std::sync::{Arc, Condvar, Mutex};

struct ResultSlot<T> {
    value: Mutex<Option<T>>,
    ready: Condvar,
}

/// Creates a connected promise/handle pair.
pub(crate) fn result_channel<T>() -> (Promise<T>, TaskHandle<T>) {
    let slot = Arc::new(ResultSlot {
        value: Mutex::new(None),
        ready: Condvar::new(),
    });
    (
        Promise {
            slot: Arc::clone(&slot),
        },
        TaskHandle { slot },
    )
}

/// Write side of a result slot; fulfilled exactly once by the task wrapper.
pub(crate) struct Promise<T> {
    slot: Arc<ResultSlot<T>>,
}

impl<T> Promise<T> {
    pub(crate) fn fulfill(self, value: T) {
        let mut guard = self.slot.value.lock().unwrap();
        debug_assert!(guard.is_none(), "promise fulfilled twice");
        *guard = Some(value);
        self.slot.ready.notify_all();
    }
}

/// Blocking handle to the result of a task submitted with
/// `submit_with_handle`.
///
/// If the producing task panics, its worker thread is lost and the result
/// never arrives; `join` would then block forever. Task bodies are required
/// not to panic (see the crate-level contract).
pub struct TaskHandle<T> {
    slot: Arc<ResultSlot<T>>,
}

impl<T> TaskHandle<T> {
    /// Blocks until the task has produced its value, then returns it.
    pub fn join(self) -> T {
        let mut guard = self.slot.value.lock().unwrap();
        while guard.is_none() {
            guard = self.slot.ready.wait(guard).unwrap();
        }
        guard.take().expect("result slot drained while held")
    }

    /// Returns `true` when the result has been produced.
    pub fn is_ready(&self) -> bool {
        self.slot.value.lock().unwrap().is_some()
    }
}
