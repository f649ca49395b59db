use std::hint::black_box;

use criterion::*;
use ecs_core::prelude::*;

mod common;
use common::*;

fn tick_benchmark(c: &mut Criterion) {
    init_meta();

    let mut group = c.benchmark_group("tick");

    group.bench_function("update_100k", |b| {
        b.iter_batched(
            || {
                let mut registry = Registry::new().unwrap();
                populate(&mut registry, RECORDS_SMALL);
                registry
            },
            |mut registry| {
                registry.invoke_update(1.0 / 60.0);
                black_box(registry);
            },
            BatchSize::LargeInput,
        );
    });

    group.bench_function("update_1M", |b| {
        b.iter_batched(
            || {
                let mut registry = Registry::new().unwrap();
                populate(&mut registry, RECORDS_MED);
                registry
            },
            |mut registry| {
                registry.invoke_update(1.0 / 60.0);
                black_box(registry);
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, tick_benchmark);
criterion_main!(benches);
