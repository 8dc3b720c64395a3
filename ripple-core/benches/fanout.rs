//! Benchmarks for notification fan-out using criterion.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ripple_core::{gate, memo, mute, writable, Release};

fn writable_fanout_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("writable_fanout");

    for subscribers in [1, 16, 256].iter() {
        let (signal, set) = writable(0u64);
        let hits = Arc::new(AtomicUsize::new(0));
        let releases: Vec<Release> = (0..*subscribers)
            .map(|_| {
                let hits = hits.clone();
                signal.subscribe(move |_| {
                    hits.fetch_add(1, Ordering::Relaxed);
                })
            })
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(subscribers), subscribers, |b, _| {
            let mut next = 0u64;
            b.iter(|| {
                next += 1;
                black_box(set.set(next))
            });
        });

        drop(releases);
    }

    group.finish();
}

fn memo_fanout_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("memo_fanout");

    for subscribers in [1, 16, 256].iter() {
        let (source, set) = writable(0u64);
        let shared = memo(&gate(&mute(&source, |n| n * 2)));
        let releases: Vec<Release> = (0..*subscribers)
            .map(|_| shared.subscribe(|fire| {
                black_box(fire);
            }))
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(subscribers), subscribers, |b, _| {
            let mut next = 0u64;
            b.iter(|| {
                next += 1;
                black_box(set.set(next))
            });
        });

        drop(releases);
    }

    group.finish();
}

criterion_group!(benches, writable_fanout_benchmark, memo_fanout_benchmark);
criterion_main!(benches);
