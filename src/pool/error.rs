//! Caller-surfaced pool failures.
//!
//! Submission errors carry the unadmitted tasks back to the caller, so a
//! refused task is never silently dropped: the caller can resubmit it,
//! run it inline, or let it fall. Enums are `#[non_exhaustive]` so variants
//! can be added without breaking downstream matches.

use std::fmt;

use super::task::Task;

/// A submission was not admitted.
#[derive(Debug)]
#[non_exhaustive]
pub enum SubmitError {
    /// A bounded pool in reject mode had no room. `tasks` holds the ordered
    /// unadmitted tail of the submission.
    Refused {
        /// The unadmitted tasks, in submission order.
        tasks: Vec<Task>,
        /// The per-worker capacity in force when admission failed.
        capacity: usize,
    },
    /// The pool is closed or closing. `tasks` holds the rejected submission.
    Closed {
        /// The rejected tasks, in submission order.
        tasks: Vec<Task>,
    },
}

impl SubmitError {
    /// Recovers the unadmitted tasks, consuming the error.
    pub fn into_tasks(self) -> Vec<Task> {
        match self {
            Self::Refused { tasks, .. } | Self::Closed { tasks } => tasks,
        }
    }

    /// Number of tasks the pool did not admit.
    pub fn refused_len(&self) -> usize {
        match self {
            Self::Refused { tasks, .. } | Self::Closed { tasks } => tasks.len(),
        }
    }
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refused { tasks, capacity } => write!(
                f,
                "admission refused: {} task(s) over per-worker capacity {}",
                tasks.len(),
                capacity
            ),
            Self::Closed { tasks } => {
                write!(f, "pool closed: {} task(s) rejected", tasks.len())
            }
        }
    }
}

impl std::error::Error for SubmitError {}

/// A lifecycle operation was invalid for the pool's current state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum LifecycleError {
    /// The pool has been closed; thread-count mutation is no longer allowed.
    Closed,
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "pool is closed"),
        }
    }
}

impl std::error::Error for LifecycleError {}
