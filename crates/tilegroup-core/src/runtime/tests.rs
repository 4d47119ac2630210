use super::*;
use crate::{
    error::ErrorClass,
    exec::ChunkData,
    frame::Frame,
    graph::{ChunkKey, ChunkMeta, ChunkOp, GraphBuilder},
    groupby::{ChunkRef, FuncSpec, GroupByParams},
    plan::{GroupByPlanner, Tiling},
    test_support::{config, kv_dataset, kv_frame, pairs},
    value::Value,
};
use std::{sync::Arc, thread};
use tilegroup_config::TilingMethod;

#[test]
fn memory_context_stores_and_fetches_chunks() {
    let ctx = MemoryContext::new();
    let key = ChunkKey::from("a");
    assert!(ctx.is_empty());
    assert!(ctx.fetch(&key).expect_err("missing").is_not_found());

    ctx.set(key.clone(), ChunkData::Frame(kv_frame(&[("a", 1)], 0)));

    assert!(ctx.contains(&key));
    assert_eq!(ctx.len(), 1);
    assert_eq!(
        ctx.fetch(&key).expect("stored").as_frame().expect("frame").nrows(),
        1
    );
}

#[test]
fn recorder_lifecycle_is_create_read_destroy() {
    let ctx = MemoryContext::new();
    let handle = ctx.create_size_recorder("probe").expect("create");

    let err = ctx
        .create_size_recorder("probe")
        .expect_err("duplicate name");
    assert_eq!(err.class, ErrorClass::InvalidInput);

    handle.record(SizeRecord::new(8, 4));
    let looked_up = ctx.size_recorder("probe").expect("registered");
    assert_eq!(looked_up.snapshot(), vec![SizeRecord::new(8, 4)]);

    assert!(ctx.destroy_size_recorder("probe"));
    assert!(!ctx.destroy_size_recorder("probe"));
    assert!(ctx.size_recorder("probe").is_none());
}

#[test]
fn concurrent_records_are_all_kept() {
    let handle = SizeRecorderHandle::new("parallel");
    let workers: Vec<_> = (0..8u64)
        .map(|i| {
            let handle = handle.clone();
            thread::spawn(move || handle.record(SizeRecord::new(i, 2 * i)))
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker");
    }

    let records = handle.snapshot();
    assert_eq!(records.len(), 8);
    let total: SizeRecord = records.into_iter().sum();
    assert_eq!(total, SizeRecord::new(28, 56));
}

#[test]
fn runner_requires_stored_sources() {
    let ctx = MemoryContext::new();
    let mut builder = GraphBuilder::new();
    let a = builder.add_source(&ChunkRef::new("a", 0));
    let b = builder.add_source(&ChunkRef::new("b", 1));
    let concat = builder
        .add(ChunkOp::Concat, vec![a, b], ChunkMeta::at(0))
        .expect("concat");
    let graph = builder.finish(vec![concat]).expect("graph");

    ctx.set("a".into(), ChunkData::Frame(kv_frame(&[("a", 1)], 0)));
    let err = LocalRunner::new(&ctx).run(&graph).expect_err("b missing");
    assert!(err.is_not_found());

    ctx.set("b".into(), ChunkData::Frame(kv_frame(&[("b", 2)], 1)));
    let runner = LocalRunner::new(&ctx);
    assert_eq!(runner.run(&graph).expect("run"), 1);
    assert_eq!(runner.run(&graph).expect("rerun"), 0);

    let frames = runner.results(&graph).expect("results");
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].nrows(), 2);
}

#[test]
fn auto_run_probes_then_reuses_probe_chunks() {
    let chunks: [&[(&str, i64)]; 3] = [&[("b", 1), ("a", 2)], &[("a", 3)], &[("c", 4), ("b", 5)]];
    let (request, ctx) = kv_dataset(
        &chunks,
        GroupByParams::by_columns(["k"]),
        FuncSpec::Single("sum".into()),
    );
    let planner = GroupByPlanner::new(config(TilingMethod::Auto, 2));

    let run = LocalRunner::new(&ctx)
        .aggregate(&planner, &request)
        .expect("aggregate");

    assert_eq!(run.probe_chunks, 2);
    assert_eq!(run.plan.method(), TilingMethod::Tree);
    assert_eq!(ctx.recorder_count(), 0);
    assert_eq!(
        pairs(&run.combined().expect("combined")),
        vec![
            (Value::from("a"), Value::Int(5)),
            (Value::from("b"), Value::Int(6)),
            (Value::from("c"), Value::Int(4)),
        ]
    );
}

fn five_chunk_sums() -> (crate::groupby::GroupByRequest, MemoryContext) {
    let chunks: [&[(&str, i64)]; 5] = [
        &[("b", 1), ("a", 2)],
        &[("a", 3)],
        &[("c", 4), ("b", 5)],
        &[("d", 6)],
        &[("a", 7), ("d", 8)],
    ];

    kv_dataset(
        &chunks,
        GroupByParams::by_columns(["k"]),
        FuncSpec::Single("sum".into()),
    )
}

fn expected_five_chunk_sums() -> Vec<(Value, Value)> {
    vec![
        (Value::from("a"), Value::Int(12)),
        (Value::from("b"), Value::Int(6)),
        (Value::from("c"), Value::Int(4)),
        (Value::from("d"), Value::Int(14)),
    ]
}

#[test]
fn repeated_auto_run_on_one_context_records_again() {
    let (request, ctx) = five_chunk_sums();
    let planner = GroupByPlanner::new(config(TilingMethod::Auto, 2));
    let runner = LocalRunner::new(&ctx);

    for attempt in 0..2 {
        let run = runner.aggregate(&planner, &request).expect("aggregate");

        assert_eq!(run.probe_chunks, 2, "attempt {attempt}");
        assert_eq!(run.plan.method(), TilingMethod::Tree);
        assert_eq!(ctx.recorder_count(), 0);
        assert_eq!(
            pairs(&run.combined().expect("combined")),
            expected_five_chunk_sums()
        );
    }
}

#[test]
fn auto_after_tree_on_one_context_still_probes() {
    let (request, ctx) = five_chunk_sums();
    let runner = LocalRunner::new(&ctx);

    let tree = runner
        .aggregate(&GroupByPlanner::new(config(TilingMethod::Tree, 2)), &request)
        .expect("tree");
    assert_eq!(tree.probe_chunks, 0);

    let auto = runner
        .aggregate(&GroupByPlanner::new(config(TilingMethod::Auto, 2)), &request)
        .expect("auto");
    assert_eq!(auto.probe_chunks, 2);
    assert_eq!(ctx.recorder_count(), 0);
    assert_eq!(
        pairs(&auto.combined().expect("combined")),
        expected_five_chunk_sums()
    );
}

#[test]
fn failed_probe_destroys_its_recorder() {
    let (mut request, ctx) = five_chunk_sums();
    request.input.chunks[0] = ChunkRef::new("absent", 0);
    let planner = GroupByPlanner::new(config(TilingMethod::Auto, 2));

    let err = LocalRunner::new(&ctx)
        .aggregate(&planner, &request)
        .expect_err("first chunk is not stored");

    assert!(err.is_not_found());
    assert_eq!(ctx.recorder_count(), 0);
}

#[test]
fn stored_recording_node_runs_again() {
    let (request, ctx) = five_chunk_sums();
    let planner = GroupByPlanner::new(config(TilingMethod::Auto, 2));
    let Tiling::Probe(pending) = planner.plan(&request, &ctx).expect("plan") else {
        panic!("five chunks over a fan-in of two should probe");
    };
    let runner = LocalRunner::new(&ctx);

    assert_eq!(runner.run(pending.probe_graph()).expect("first run"), 2);
    assert_eq!(runner.run(pending.probe_graph()).expect("second run"), 2);
    assert_eq!(
        ctx.size_recorder(pending.recorder_name())
            .expect("recorder")
            .snapshot()
            .len(),
        4
    );
}

#[test]
fn shared_context_is_usable_across_threads() {
    let ctx = Arc::new(MemoryContext::new());
    let writers: Vec<_> = (0..4)
        .map(|i| {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || {
                let frame: Frame = kv_frame(&[("k", i)], 0);
                ctx.set(format!("chunk-{i}").into(), ChunkData::Frame(frame));
            })
        })
        .collect();
    for writer in writers {
        writer.join().expect("writer");
    }

    assert_eq!(ctx.len(), 4);
}
