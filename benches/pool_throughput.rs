//! Empty-task throughput across the three pool shapes.
//!
//! Regression bound: one million empty tasks should complete in sub-second
//! time on the fixed pools and low single-digit seconds on the dynamic
//! pool. Criterion runs smaller iterations here; the absolute bound is a
//! manual check, the relative numbers are the regression signal.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use taskpool_rs::{BalancedPool, DynamicPool, SteadyPool, TaskPool};

const TASKS_PER_ITER: u64 = 100_000;
const BATCH: usize = 1_000;

fn bench_single_submit(c: &mut Criterion) {
    let workers = num_cpus::get().max(2);
    let mut group = c.benchmark_group("single_submit");
    group.throughput(Throughput::Elements(TASKS_PER_ITER));
    group.sample_size(10);

    group.bench_function(BenchmarkId::new("steady", workers), |b| {
        b.iter(|| {
            let pool = SteadyPool::new(workers);
            for _ in 0..TASKS_PER_ITER {
                pool.submit(|| {}).unwrap();
            }
            pool.wait_for_tasks();
            pool.close();
        });
    });

    group.bench_function(BenchmarkId::new("balanced", workers), |b| {
        b.iter(|| {
            let pool = BalancedPool::new(workers);
            for _ in 0..TASKS_PER_ITER {
                pool.submit(|| {}).unwrap();
            }
            pool.wait_for_tasks();
            pool.close();
        });
    });

    group.bench_function(BenchmarkId::new("dynamic", workers), |b| {
        b.iter(|| {
            let pool = DynamicPool::new(workers);
            for _ in 0..TASKS_PER_ITER {
                pool.submit(|| {}).unwrap();
            }
            pool.wait_for_tasks();
            pool.close();
        });
    });

    group.finish();
}

fn bench_batch_submit(c: &mut Criterion) {
    let workers = num_cpus::get().max(2);
    let mut group = c.benchmark_group("batch_submit");
    group.throughput(Throughput::Elements(TASKS_PER_ITER));
    group.sample_size(10);

    // The unbounded fixed-pool fast path: one lock acquisition per batch.
    group.bench_function(BenchmarkId::new("steady", BATCH), |b| {
        b.iter(|| {
            let pool = SteadyPool::new(workers);
            for _ in 0..(TASKS_PER_ITER as usize / BATCH) {
                pool.submit_batch((0..BATCH).map(|_| || {})).unwrap();
            }
            pool.wait_for_tasks();
            pool.close();
        });
    });

    group.bench_function(BenchmarkId::new("dynamic", BATCH), |b| {
        b.iter(|| {
            let pool = DynamicPool::new(workers);
            for _ in 0..(TASKS_PER_ITER as usize / BATCH) {
                pool.submit_batch((0..BATCH).map(|_| || {})).unwrap();
            }
            pool.wait_for_tasks();
            pool.close();
        });
    });

    group.finish();
}

fn bench_submit_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_latency");

    group.bench_function("steady_submit_one", |b| {
        let pool = SteadyPool::new(2);
        b.iter(|| pool.submit(|| {}).unwrap());
        pool.wait_for_tasks();
        pool.close();
    });

    group.bench_function("dynamic_submit_one", |b| {
        let pool = DynamicPool::new(2);
        b.iter(|| pool.submit(|| {}).unwrap());
        pool.wait_for_tasks();
        pool.close();
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_single_submit,
    bench_batch_submit,
    bench_submit_latency
);
criterion_main!(benches);
