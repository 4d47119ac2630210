//! Module: plan::tree
//! Responsibility: positional fan-in combine rounds and the terminal agg.
//! Does not own: the auto budget decision (see `plan::auto`).
//! Boundary: emits exactly one agg chunk.

use crate::{
    error::InternalError,
    graph::{ChunkKey, ChunkMeta, ChunkOp},
    plan::{AggregationPlan, Staging},
};
use log::debug;
use tilegroup_config::TilingMethod;

///
/// TreeBudget
///
/// Size estimate of one combine input and the ceiling the merged chunk
/// should stay under.
///

#[derive(Clone, Copy, Debug)]
pub(super) struct TreeBudget {
    pub(super) estimate: f64,
    pub(super) ceiling: f64,
}

/// Map every input chunk and combine down to one agg chunk.
pub(super) fn plan(mut staging: Staging) -> Result<AggregationPlan, InternalError> {
    let inputs = staging.input_chunks();
    let maps = staging.map_chunks(&inputs, None)?;
    let (survivors, _) = combine_rounds(&mut staging, maps, None)?;
    let result = finish(&mut staging, survivors)?;

    staging.finish(TilingMethod::Tree, vec![result])
}

/// Combine positional batches of `combine_size` until at most that many
/// chunks remain or the projected merged size reaches the budget ceiling.
/// Returns the surviving chunks and the final size projection.
pub(super) fn combine_rounds(
    staging: &mut Staging,
    mut chunks: Vec<ChunkKey>,
    budget: Option<TreeBudget>,
) -> Result<(Vec<ChunkKey>, Option<f64>), InternalError> {
    let combine_size = staging.operand.combine_size().max(2);
    let combine = staging.operand.for_combine();
    let mut estimate = budget.map(|budget| budget.estimate);

    let mut round = 0;
    while chunks.len() > combine_size
        && budget.is_none_or(|budget| estimate.is_some_and(|size| size < budget.ceiling))
    {
        let mut next = Vec::with_capacity(chunks.len().div_ceil(combine_size));
        for (position, batch) in chunks.chunks(combine_size).enumerate() {
            let input = match batch {
                [single] => single.clone(),
                _ => staging.builder.add(
                    ChunkOp::Concat,
                    batch.to_vec(),
                    ChunkMeta::at(position),
                )?,
            };
            next.push(staging.builder.add(
                ChunkOp::Aggregate(combine.clone()),
                vec![input],
                ChunkMeta::at(position),
            )?);
        }

        round += 1;
        debug!(
            "groupby '{}': combine round {round} reduced {} chunks to {}",
            staging.request.input.id,
            chunks.len(),
            next.len(),
        );
        chunks = next;
        estimate = estimate.map(|size| size * combine_size as f64);
    }

    Ok((chunks, estimate))
}

/// Concatenate the survivors, if several, under one agg chunk.
pub(super) fn finish(staging: &mut Staging, chunks: Vec<ChunkKey>) -> Result<ChunkKey, InternalError> {
    let input = match chunks.as_slice() {
        [single] => single.clone(),
        [] => {
            return Err(InternalError::planner_invariant(
                "tree combine finished without chunks",
            ));
        }
        _ => staging
            .builder
            .add(ChunkOp::Concat, chunks, ChunkMeta::at(0))?,
    };

    staging.agg_chunk(input, 0)
}
