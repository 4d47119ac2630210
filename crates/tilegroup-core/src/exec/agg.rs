//! Module: exec::agg
//! Responsibility: finalize partials into the declared result frame.
//! Does not own: schema reconciliation rules (see `exec::reconcile`).
//! Boundary: only stage whose output leaves the graph.

use crate::{
    error::InternalError,
    exec::{ChunkData, PartialTuple, combine::unpack, reconcile, single_input},
    frame::Frame,
    graph::ChunkKey,
    groupby::AggregationOperand,
    reduce::{StepFunc, StepKey},
    runtime::ExecutionContext,
};
use std::collections::HashMap;

pub(super) fn execute(
    operand: &AggregationOperand,
    inputs: &[ChunkKey],
    ctx: &dyn ExecutionContext,
) -> Result<ChunkData, InternalError> {
    let data = ctx.fetch(single_input(inputs)?)?;
    let result = aggregate_partials(operand, data.as_partials()?)?;

    Ok(ChunkData::Frame(result))
}

/// Finalize every step, evaluate post steps and conform the result to the
/// operand's output schema.
pub(crate) fn aggregate_partials(
    operand: &AggregationOperand,
    partials: &PartialTuple,
) -> Result<Frame, InternalError> {
    let steps = operand.steps();

    // Phase 1: collapse each step's partials.
    let mut finals: HashMap<&StepKey, Frame> = HashMap::with_capacity(steps.agg().len());
    for (step, grouped) in unpack(operand, partials)? {
        let frame = match &step.agg {
            StepFunc::Builtin(stat) => match grouped.as_slice() {
                [partial] => stat.apply(partial, step.kwargs)?,
                other => {
                    return Err(InternalError::executor_invariant(format!(
                        "builtin step '{}' received {} partials",
                        step.output_key,
                        other.len(),
                    )));
                }
            },
            StepFunc::Custom(handle) => handle.handler().execute_agg(step, &grouped)?,
        };
        finals.insert(&step.output_key, frame);
    }

    // Phase 2: post steps, one output per requested function.
    let mut outputs = Vec::with_capacity(steps.post().len());
    for post in steps.post() {
        let inputs = post
            .input_keys
            .iter()
            .map(|key| {
                finals.get(key).ok_or_else(|| {
                    InternalError::executor_invariant(format!("agg output '{key}' was not computed"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        outputs.push((post.display_name.as_str(), post.finalize.apply(&inputs)?));
    }

    // Phase 3: shape the result.
    Ok(reconcile::conform(
        operand.schema(),
        operand.reset_output_index(),
        outputs,
    )?)
}
