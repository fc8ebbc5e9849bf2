//! Overflow behavior for bounded fixed pools.
//!
//! Admission runs against the destination worker's queue. When the queue is
//! at capacity, the configured policy decides what happens to the task(s)
//! that did not fit. With capacity 0 (unbounded) the policy never fires.

use core::fmt;
use std::sync::Arc;

use super::task::Task;

/// Sink receiving an ordered batch of refused tasks.
///
/// Invoked synchronously on the submitting producer's thread, before the
/// submit call returns. The callback must not submit into the same bounded
/// pool: doing so can recurse straight back into overflow.
pub type OverflowCallback = Arc<dyn Fn(Vec<Task>) + Send + Sync>;

/// What a bounded pool does with tasks it cannot admit.
#[derive(Clone, Default)]
#[non_exhaustive]
pub enum OverflowPolicy {
    /// Admission fails; the unadmitted tasks come back to the caller inside
    /// [`SubmitError::Refused`](super::error::SubmitError::Refused).
    #[default]
    Reject,
    /// The producer blocks until the destination drains enough to fit.
    Block,
    /// The refused ordered batch is handed to the callback and discarded by
    /// the pool; submission reports success.
    Callback(OverflowCallback),
}

impl fmt::Debug for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => f.write_str("Reject"),
            Self::Block => f.write_str("Block"),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}
