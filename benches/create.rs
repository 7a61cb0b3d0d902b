use criterion::*;
use std::hint::black_box;

mod common;
use common::*;

fn create_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("create");

    group.bench_function("create_100k_objects", |b| {
        b.iter_batched(
            make_runtime,
            |mut runtime| {
                let handles = populate(&mut runtime, OBJECTS_MED).unwrap();
                black_box((runtime, handles));
            },
            BatchSize::LargeInput,
        );
    });

    // Every slot comes off the free list.
    group.bench_function("recreate_10k_reused_slots", |b| {
        b.iter_batched(
            || {
                let mut runtime = make_runtime();
                let handles = populate(&mut runtime, OBJECTS_SMALL).unwrap();
                drop(handles);
                runtime.apply_deferred();
                runtime
            },
            |mut runtime| {
                let handles = populate(&mut runtime, OBJECTS_SMALL).unwrap();
                black_box((runtime, handles));
            },
            BatchSize::LargeInput,
        );
    });

    group.bench_function("destroy_10k_deferred", |b| {
        b.iter_batched(
            || {
                let mut runtime = make_runtime();
                let handles = populate(&mut runtime, OBJECTS_SMALL).unwrap();
                (runtime, handles)
            },
            |(mut runtime, handles)| {
                drop(handles);
                black_box(runtime.apply_deferred());
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, create_benchmark);
criterion_main!(benches);
