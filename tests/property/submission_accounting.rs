//! Property tests for the exactly-once admission invariant.
//!
//! For every submitted task, exactly one of the following happens: it is
//! invoked, it is returned to the caller inside a submit error, or it is
//! handed to the overflow callback. Never two of them, never none.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use proptest::prelude::*;

use taskpool_rs::{
    BalancedPool, DynamicPool, FixedPoolConfig, OverflowPolicy, SteadyPool, SubmitError, Task,
    TaskPool,
};

fn counting_task(hits: &Arc<AtomicUsize>) -> impl FnOnce() + Send + 'static {
    let hits = Arc::clone(hits);
    move || {
        hits.fetch_add(1, Ordering::Relaxed);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn steady_callback_accounts_for_every_task(
        threads in 1usize..4,
        capacity in 1usize..16,
        submissions in 0usize..400,
    ) {
        let invoked = Arc::new(AtomicUsize::new(0));
        let called_back = Arc::new(AtomicUsize::new(0));

        let cb = Arc::clone(&called_back);
        let pool = SteadyPool::with_config(FixedPoolConfig {
            threads,
            capacity,
            overflow: OverflowPolicy::Callback(Arc::new(move |refused: Vec<Task>| {
                cb.fetch_add(refused.len(), Ordering::Relaxed);
            })),
        });

        for _ in 0..submissions {
            pool.submit(counting_task(&invoked)).unwrap();
        }
        pool.wait_for_tasks();
        pool.close();

        prop_assert_eq!(
            invoked.load(Ordering::Relaxed) + called_back.load(Ordering::Relaxed),
            submissions
        );
    }

    #[test]
    fn balanced_reject_returns_exactly_the_unadmitted(
        threads in 1usize..4,
        capacity in 1usize..8,
        submissions in 0usize..200,
    ) {
        let invoked = Arc::new(AtomicUsize::new(0));
        let mut returned = 0usize;

        let pool = BalancedPool::with_config(FixedPoolConfig {
            threads,
            capacity,
            overflow: OverflowPolicy::Reject,
        });

        for _ in 0..submissions {
            match pool.submit(counting_task(&invoked)) {
                Ok(()) => {}
                Err(SubmitError::Refused { tasks, .. }) => returned += tasks.len(),
                Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
            }
        }
        pool.wait_for_tasks();
        pool.close();

        prop_assert_eq!(invoked.load(Ordering::Relaxed) + returned, submissions);
    }

    #[test]
    fn dynamic_batches_all_execute(
        workers in 1usize..5,
        batches in prop::collection::vec(0usize..60, 0..6),
    ) {
        let invoked = Arc::new(AtomicUsize::new(0));
        let pool = DynamicPool::new(workers);

        let mut submitted = 0usize;
        for batch in &batches {
            let tasks: Vec<_> = (0..*batch).map(|_| counting_task(&invoked)).collect();
            pool.submit_batch(tasks).unwrap();
            submitted += batch;
        }
        pool.wait_for_tasks();
        pool.close();

        prop_assert_eq!(invoked.load(Ordering::Relaxed), submitted);
    }
}
