use std::hint::black_box;

use criterion::*;
use ecs_core::prelude::*;

mod common;
use common::*;

fn spawn_benchmark(c: &mut Criterion) {
    init_meta();

    let mut group = c.benchmark_group("spawn");
    group.sample_size(20);

    group.bench_function("create_100k_records", |b| {
        b.iter(|| {
            let mut registry = Registry::new().unwrap();
            for _ in 0..RECORDS_SMALL {
                black_box(registry.create::<Mover>());
            }
            black_box(registry);
        });
    });

    group.bench_function("destroy_and_sweep_100k_records", |b| {
        b.iter_batched(
            || {
                let mut registry = Registry::new().unwrap();
                let handles: Vec<Handle> = (0..RECORDS_SMALL)
                    .map(|_| registry.create::<Mover>())
                    .collect();
                (registry, handles)
            },
            |(mut registry, handles)| {
                for handle in handles {
                    registry.destroy(handle);
                }
                black_box(registry.process_deferred_destructions());
                black_box(registry);
            },
            BatchSize::LargeInput,
        );
    });

    group.bench_function("recreate_into_recycled_indices", |b| {
        b.iter_batched(
            || {
                let mut registry = Registry::new().unwrap();
                let handles: Vec<Handle> = (0..RECORDS_SMALL)
                    .map(|_| registry.create::<Mover>())
                    .collect();
                for handle in handles {
                    registry.destroy(handle);
                }
                registry.process_deferred_destructions();
                registry
            },
            |mut registry| {
                for _ in 0..RECORDS_SMALL {
                    black_box(registry.create::<Mover>());
                }
                black_box(registry);
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, spawn_benchmark);
criterion_main!(benches);
