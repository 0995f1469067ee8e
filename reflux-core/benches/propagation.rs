//! Benchmarks for reflux-core
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reflux_core::{computed, observable, Computed};

// =============================================================================
// OBSERVABLE BENCHMARKS
// =============================================================================

fn bench_observable_get(c: &mut Criterion) {
    let o = observable(42i32);
    c.bench_function("observable_get", |b| b.iter(|| black_box(o.get())));
}

fn bench_observable_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("observable_fan_out");

    for subscribers in [1usize, 10, 100] {
        let o = observable(0i32);
        for _ in 0..subscribers {
            o.subscribe(|v| {
                black_box(*v);
            });
        }

        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, _| b.iter(|| o.set(black_box(1)).unwrap()),
        );
    }

    group.finish();
}

// =============================================================================
// COMPUTED BENCHMARKS
// =============================================================================

fn bench_computed_get_cached(c: &mut Criterion) {
    let o = observable(42i32);
    let o2 = o.clone();
    let doubled = computed(move || o2.get() * 2);

    c.bench_function("computed_get_cached", |b| b.iter(|| black_box(doubled.get())));
}

fn bench_computed_get_dirty(c: &mut Criterion) {
    let o = observable(0i32);
    let o2 = o.clone();
    let doubled = computed(move || o2.get() * 2);

    let mut i = 0;
    c.bench_function("computed_get_dirty", |b| {
        b.iter(|| {
            i += 1;
            o.set(i).unwrap();
            black_box(doubled.get())
        })
    });
}

fn chain(depth: usize) -> (reflux_core::Observable<i64>, Computed<i64>) {
    let root = observable(0i64);
    let r = root.clone();
    let mut tail = computed(move || r.get() + 1);
    for _ in 1..depth {
        let prev = tail.clone();
        tail = computed(move || prev.get() + 1);
    }
    (root, tail)
}

fn bench_computed_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("computed_chain");

    for depth in [1usize, 10, 100] {
        let (root, tail) = chain(depth);
        let mut i = 0;

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| {
                i += 1;
                root.set(i).unwrap();
                black_box(tail.get())
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_observable_get,
    bench_observable_fan_out,
    bench_computed_get_cached,
    bench_computed_get_dirty,
    bench_computed_chain,
);
criterion_main!(benches);
