//! Property-based soundness tests.
//!
//! Run with: `cargo test --test property`

mod submission_accounting;
