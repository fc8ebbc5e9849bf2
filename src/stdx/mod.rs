//! Small, self-contained primitives used across the crate.
//!
//! `stdx` hosts narrow utilities tuned for the pool's hot paths rather than
//! general-purpose ergonomics.
//!
//! # Module map
//! - `spin`: test-and-set spinlock with pause/yield backoff, guarding the
//!   worker-local task queues.

pub mod spin;

pub use spin::{SpinGuard, SpinLock};
