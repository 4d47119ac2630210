//! Module: plan::shuffle
//! Responsibility: sample-sort and hash shuffle topologies.
//! Does not own: pivot selection or bucket routing (see `exec::shuffle`).
//! Boundary: one reducer and one agg chunk per shuffled input.

use crate::{
    error::InternalError,
    graph::{
        ChunkKey, ChunkMeta, ChunkOp, PartitionMode, PivotOperand, SampleOperand,
        ShuffleMapOperand, ShuffleReduceOperand,
    },
    plan::{AggregationPlan, Staging},
};
use log::debug;
use tilegroup_config::TilingMethod;

/// Map every input chunk and shuffle the partials to one reducer each.
pub(super) fn plan(mut staging: Staging) -> Result<AggregationPlan, InternalError> {
    let inputs = staging.input_chunks();
    let maps = staging.map_chunks(&inputs, None)?;
    let results = shuffle_chunks(&mut staging, maps, inputs.len())?;

    staging.finish(TilingMethod::Shuffle, results)
}

/// Partition keyed partials into `chunks.len()` reducers and finalize each.
/// Sorted grouping over more than one input chunk partitions by sampled
/// pivots so reducer `i` holds only keys not above those of reducer `i + 1`;
/// otherwise keys are partitioned by stable hash.
pub(super) fn shuffle_chunks(
    staging: &mut Staging,
    chunks: Vec<ChunkKey>,
    input_chunks: usize,
) -> Result<Vec<ChunkKey>, InternalError> {
    let partitions = chunks.len();
    let pivoted = staging.operand.params().sort() && input_chunks > 1;

    let mut maps = Vec::with_capacity(partitions);
    if pivoted {
        let count = partitions * staging.config.samples_per_partition();
        let mut samples = Vec::with_capacity(partitions);
        for (position, chunk) in chunks.iter().enumerate() {
            samples.push(staging.builder.add(
                ChunkOp::Sample(SampleOperand { count }),
                vec![chunk.clone()],
                ChunkMeta::at(position),
            )?);
        }
        let pivot = staging.builder.add(
            ChunkOp::Pivot(PivotOperand { partitions }),
            samples,
            ChunkMeta::at(0),
        )?;

        for (position, chunk) in chunks.iter().enumerate() {
            maps.push(staging.builder.add(
                ChunkOp::ShuffleMap(ShuffleMapOperand {
                    partitions,
                    mode: PartitionMode::Pivot,
                }),
                vec![chunk.clone(), pivot.clone()],
                ChunkMeta::at(position),
            )?);
        }
    } else {
        for (position, chunk) in chunks.iter().enumerate() {
            maps.push(staging.builder.add(
                ChunkOp::ShuffleMap(ShuffleMapOperand {
                    partitions,
                    mode: PartitionMode::Hash,
                }),
                vec![chunk.clone()],
                ChunkMeta::at(position),
            )?);
        }
    }

    let proxy = staging
        .builder
        .add(ChunkOp::ShuffleProxy, maps, ChunkMeta::at(0))?;

    let mut results = Vec::with_capacity(partitions);
    for bucket in 0..partitions {
        let reduce = staging.builder.add(
            ChunkOp::ShuffleReduce(ShuffleReduceOperand { bucket, partitions }),
            vec![proxy.clone()],
            ChunkMeta::at(bucket),
        )?;
        results.push(staging.agg_chunk(reduce, bucket)?);
    }

    debug!(
        "groupby '{}': shuffle over {partitions} partitions ({})",
        staging.request.input.id,
        if pivoted { "pivot" } else { "hash" },
    );

    Ok(results)
}
