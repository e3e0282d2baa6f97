//! Benchmarks for pipeline invocation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stagechain::prelude::*;

fn chain_of(depth: usize) -> Pipeline<u64, u64> {
    let builder = PipelineBuilder::new();
    for _ in 0..depth {
        builder
            .register_fn(|ctx: u64, next: Next<u64, u64>, cancel| next.run(ctx + 1, cancel))
            .expect("builder is open");
    }
    builder
        .build_with(|ctx: u64, _| async move { ctx })
        .expect("builder is open")
}

fn pipeline_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let mut group = c.benchmark_group("invoke");

    for depth in [0_usize, 4, 16, 64] {
        let pipeline = chain_of(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| {
                let token = CancellationToken::new();
                black_box(runtime.block_on(pipeline.invoke(black_box(1), token)))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
