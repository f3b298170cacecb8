//! Arena allocation benchmarks.
//!
//! Compares bump allocation against the global allocator for:
//! - many small allocations released together
//! - batched workloads that reset the arena between batches
//! - temporary scopes inside a long-lived arena

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use regio_mem::Arena;

const MAX_SIZE: usize = 256;

fn bench_small_allocations(c: &mut Criterion) {
    let mut group = c.benchmark_group("small_allocations");

    for count in [100usize, 1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::new("arena", count), count, |b, &count| {
            b.iter(|| {
                let mut arena = Arena::new(count * MAX_SIZE);
                for i in 0..count {
                    let size = (i % MAX_SIZE) + 1;
                    let ptr = arena.alloc(size).unwrap();
                    unsafe { ptr.as_ptr().write_bytes(i as u8, size) };
                    black_box(ptr);
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("global", count), count, |b, &count| {
            b.iter(|| {
                let mut boxes = Vec::with_capacity(count);
                for i in 0..count {
                    let size = (i % MAX_SIZE) + 1;
                    boxes.push(black_box(vec![i as u8; size].into_boxed_slice()));
                }
                drop(boxes);
            });
        });
    }

    group.finish();
}

fn bench_growth(c: &mut Criterion) {
    c.bench_function("growth_from_small_head", |b| {
        b.iter(|| {
            let mut arena = Arena::new(64);
            for i in 0..4_096usize {
                black_box(arena.alloc((i % 64) + 1).unwrap());
            }
            black_box(arena.block_count())
        });
    });
}

fn bench_reset_batches(c: &mut Criterion) {
    let mut group = c.benchmark_group("reset_batches");

    group.bench_function("arena", |b| {
        let mut arena = Arena::new(MAX_SIZE * 1_000);
        b.iter(|| {
            for batch in 0..10usize {
                for i in 0..1_000usize {
                    let size = ((i * 31 + batch) % MAX_SIZE) + 1;
                    black_box(arena.alloc(size).unwrap());
                }
                arena.reset();
            }
        });
    });

    group.bench_function("global", |b| {
        b.iter(|| {
            for batch in 0..10usize {
                let batch_allocs: Vec<Box<[u8]>> = (0..1_000usize)
                    .map(|i| vec![0u8; ((i * 31 + batch) % MAX_SIZE) + 1].into_boxed_slice())
                    .collect();
                black_box(batch_allocs);
            }
        });
    });

    group.finish();
}

fn bench_temp_scope(c: &mut Criterion) {
    c.bench_function("temp_scope_round_trip", |b| {
        let mut arena = Arena::new(64 * 1024);
        arena.alloc(1_000).unwrap();
        b.iter(|| {
            let scope = arena.temp_begin();
            for _ in 0..32 {
                black_box(arena.alloc(48).unwrap());
            }
            arena.temp_end(scope)
        });
    });
}

criterion_group!(
    benches,
    bench_small_allocations,
    bench_growth,
    bench_reset_batches,
    bench_temp_scope
);
criterion_main!(benches);
