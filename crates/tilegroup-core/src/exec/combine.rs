//! Module: exec::combine
//! Responsibility: merge stacked partial tuples by index level.
//! Does not own: batch selection (see `plan::tree`).
//! Boundary: output keeps the input tuple width.

use crate::{
    error::InternalError,
    exec::{ChunkData, PartialTuple, map::check_width, single_input},
    frame::GroupedFrame,
    graph::ChunkKey,
    groupby::AggregationOperand,
    reduce::{AggStep, StepFunc},
    runtime::ExecutionContext,
};

pub(super) fn execute(
    operand: &AggregationOperand,
    inputs: &[ChunkKey],
    ctx: &dyn ExecutionContext,
) -> Result<ChunkData, InternalError> {
    let data = ctx.fetch(single_input(inputs)?)?;
    let combined = combine_partials(operand, data.as_partials()?)?;

    Ok(ChunkData::Partials(combined))
}

/// Merge partials that share keys; the tuple keeps its shape.
pub(crate) fn combine_partials(
    operand: &AggregationOperand,
    partials: &PartialTuple,
) -> Result<PartialTuple, InternalError> {
    let mut combined = Vec::with_capacity(partials.len());
    for (step, grouped) in unpack(operand, partials)? {
        let frames = match &step.agg {
            StepFunc::Builtin(stat) => grouped
                .iter()
                .map(|partial| stat.apply(partial, step.kwargs))
                .collect::<Result<Vec<_>, _>>()?,
            StepFunc::Custom(handle) => handle.handler().execute_combine(step, &grouped)?,
        };
        check_width(step, frames.len())?;
        combined.extend(frames);
    }

    Ok(PartialTuple::new(combined))
}

/// Split a partial tuple by step and regroup each partial by the operand's
/// index levels.
pub(super) fn unpack<'a>(
    operand: &'a AggregationOperand,
    partials: &PartialTuple,
) -> Result<Vec<(&'a AggStep, Vec<GroupedFrame>)>, InternalError> {
    let steps = operand.steps();
    if partials.len() != steps.partial_width() {
        return Err(InternalError::executor_invariant(format!(
            "partial tuple has {} frames, reduction expects {}",
            partials.len(),
            steps.partial_width(),
        )));
    }
    let levels = operand.params().level().ok_or_else(|| {
        InternalError::executor_invariant("regrouping stage has no index levels")
    })?;

    let mut frames = partials.iter();
    let mut unpacked = Vec::with_capacity(steps.agg().len());
    for step in steps.agg() {
        let mut grouped = Vec::with_capacity(step.output_count);
        for frame in frames.by_ref().take(step.output_count) {
            grouped.push(GroupedFrame::from_index_levels(
                frame.clone(),
                levels,
                operand.params().sort(),
            )?);
        }
        unpacked.push((step, grouped));
    }

    Ok(unpacked)
}
