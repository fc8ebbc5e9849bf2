//! Type-erased unit of work.
//!
//! A [`Task`] owns exactly one heap record holding the captured callable.
//! Ownership moves producer → queue → worker; `invoke` consumes the task,
//! so a task body runs at most once and the closure is dropped right after
//! it returns. There is no small-object optimization: one allocation per
//! task is the baseline contract the pool's throughput numbers assume.

use core::fmt;

type BoxedCall = Box<dyn FnOnce() + Send + 'static>;

/// A move-only, type-erased zero-argument callable.
///
/// A default-constructed task is unset ([`Task::is_set`] returns `false`)
/// and must not be invoked. Tasks capture no producer context; any state the
/// body needs must be closed over by the callable itself.
#[derive(Default)]
pub struct Task {
    call: Option<BoxedCall>,
}

impl Task {
    /// Wraps a callable, allocating its heap record.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            call: Some(Box::new(f)),
        }
    }

    /// Returns `true` when the task holds a callable.
    #[inline]
    pub fn is_set(&self) -> bool {
        self.call.is_some()
    }

    /// Replaces the held callable, dropping any previous one uninvoked.
    pub fn reset<F>(&mut self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.call = Some(Box::new(f));
    }

    /// Runs the task body, consuming the task.
    ///
    /// # Panics
    ///
    /// Panics if the task is unset. A panic escaping the body itself is a
    /// contract violation by the caller's closure and is not caught here;
    /// the invoking worker thread is lost.
    #[inline]
    pub fn invoke(self) {
        let call = self.call.expect("invoked an unset task");
        call();
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("set", &self.is_set()).finish()
    }
}
