//! Benchmarks for pipeline execution.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use deckflow::prelude::*;
use deckflow::testing::mocks::StaticStage;
use std::sync::Arc;

fn four_stage_pipeline() -> Pipeline {
    PipelineBuilder::new()
        .stage(Arc::new(StaticStage::echoing(stage_names::INPUT_VALIDATION)))
        .stage(Arc::new(StaticStage::echoing(stage_names::CONTENT_GENERATION)))
        .stage(Arc::new(StaticStage::echoing(stage_names::SLIDE_CREATION)))
        .stage(Arc::new(StaticStage::echoing(
            stage_names::PRESENTATION_ASSEMBLY,
        )))
        .build()
        .unwrap()
}

fn pipeline_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let pipeline = four_stage_pipeline();

    c.bench_function("four_stage_echo", |b| {
        b.iter(|| {
            let ctx = runtime.block_on(pipeline.execute(black_box(serde_json::json!({
                "topic": "Benchmark",
                "num_slides": 10,
            }))));
            black_box(ctx)
        })
    });
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
