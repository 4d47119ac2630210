use super::*;
use crate::groupby::ChunkRef;

fn source(key: &str, position: usize) -> ChunkRef {
    ChunkRef::new(key, position).with_rows(10)
}

#[test]
fn sources_keep_caller_keys_and_shape() {
    let mut builder = GraphBuilder::new();
    let key = builder.add_source(&source("in-0", 0));

    assert_eq!(key.as_str(), "in-0");
    let node = builder.node(&key).expect("source node");
    assert_eq!(node.stage_label(), "source");
    assert_eq!(node.meta().shape.rows, Some(10));
}

#[test]
fn planned_keys_are_content_addressed() {
    let build = || {
        let mut builder = GraphBuilder::new();
        let a = builder.add_source(&source("a", 0));
        let b = builder.add_source(&source("b", 1));
        builder
            .add(ChunkOp::Concat, vec![a, b], ChunkMeta::at(0))
            .expect("concat node")
    };

    let first = build();
    let second = build();
    assert_eq!(first, second);
    assert_eq!(first.as_str().len(), 32);
}

#[test]
fn key_depends_on_inputs_operation_and_position() {
    let mut builder = GraphBuilder::new();
    let a = builder.add_source(&source("a", 0));
    let b = builder.add_source(&source("b", 1));

    let concat_ab = builder
        .add(ChunkOp::Concat, vec![a.clone(), b.clone()], ChunkMeta::at(0))
        .expect("concat ab");
    let concat_ba = builder
        .add(ChunkOp::Concat, vec![b.clone(), a.clone()], ChunkMeta::at(0))
        .expect("concat ba");
    let concat_moved = builder
        .add(ChunkOp::Concat, vec![a.clone(), b], ChunkMeta::at(1))
        .expect("concat moved");
    let sample = builder
        .add(
            ChunkOp::Sample(SampleOperand { count: 3 }),
            vec![a],
            ChunkMeta::at(0),
        )
        .expect("sample");

    assert_ne!(concat_ab, concat_ba);
    assert_ne!(concat_ab, concat_moved);
    assert_ne!(concat_ab, sample);
}

#[test]
fn duplicate_nodes_are_added_once() {
    let mut builder = GraphBuilder::new();
    let a = builder.add_source(&source("a", 0));
    builder.add_source(&source("a", 0));

    let first = builder
        .add(ChunkOp::ShuffleProxy, vec![a.clone()], ChunkMeta::at(0))
        .expect("proxy");
    let second = builder
        .add(ChunkOp::ShuffleProxy, vec![a], ChunkMeta::at(0))
        .expect("proxy again");

    assert_eq!(first, second);
    assert_eq!(builder.len(), 2);
}

#[test]
fn unknown_inputs_are_rejected() {
    let mut builder = GraphBuilder::new();
    let err = builder
        .add(
            ChunkOp::Concat,
            vec![ChunkKey::new("missing")],
            ChunkMeta::at(0),
        )
        .expect_err("input was never planned");

    assert_eq!(err.class, crate::error::ErrorClass::InvariantViolation);
}

#[test]
fn finish_checks_results_and_reports_stages() {
    let mut builder = GraphBuilder::new();
    let a = builder.add_source(&source("a", 0));
    let proxy = builder
        .add(ChunkOp::ShuffleProxy, vec![a], ChunkMeta::at(0))
        .expect("proxy");

    assert!(
        builder
            .snapshot(vec![ChunkKey::new("nope")])
            .is_err()
    );

    let graph = builder.finish(vec![proxy.clone()]).expect("graph");
    assert_eq!(graph.stage_sequence(), vec!["source", "proxy"]);
    assert_eq!(graph.count_stage("proxy"), 1);
    assert_eq!(graph.results(), &[proxy.clone()]);
    assert_eq!(graph.node(&proxy).map(ChunkNode::inputs).map(<[_]>::len), Some(1));
}
