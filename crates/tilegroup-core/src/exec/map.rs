//! Module: exec::map
//! Responsibility: group one input chunk and emit its partial tuple.
//! Does not own: key resolution planning or recorder lifecycle.
//! Boundary: records chunk sizes when the operand carries a recorder.

use crate::{
    error::InternalError,
    exec::{ChunkData, PartialTuple},
    frame::{Column, ColumnLabel, Frame, GroupedFrame, KeyColumn},
    graph::ChunkKey,
    groupby::{AggregationOperand, ByKey, GroupByParams, KeySource},
    reduce::{AggStep, ReductionSteps, StepFunc, StepKey},
    runtime::{ExecutionContext, SizeRecord},
};
use std::collections::HashMap;

pub(super) fn execute(
    operand: &AggregationOperand,
    inputs: &[ChunkKey],
    ctx: &dyn ExecutionContext,
) -> Result<ChunkData, InternalError> {
    let source = inputs.first().ok_or_else(|| {
        InternalError::executor_invariant("map node has no input chunk")
    })?;
    let data = ctx.fetch(source)?;
    let frame = data.as_frame()?;

    let grouped = group_input(operand.params(), frame, |key| series_keys(key, ctx))?;
    let partials = map_partials(operand.steps(), &grouped)?;

    if let Some(recorder) = operand.size_recorder() {
        recorder.record(SizeRecord::new(
            frame.estimated_size(),
            partials.estimated_size(),
        ));
    }

    Ok(ChunkData::Partials(partials))
}

/// Group one input frame. Key columns are removed from the value columns and
/// the selection, if any, is applied afterwards. `external` yields the values
/// of key series that do not live in the frame.
pub(crate) fn group_input<F>(
    params: &GroupByParams,
    data: &Frame,
    mut external: F,
) -> Result<GroupedFrame, InternalError>
where
    F: FnMut(&ByKey) -> Result<Column, InternalError>,
{
    if let Some(levels) = params.level() {
        let values = select(params, data.clone())?;

        return Ok(GroupedFrame::from_index_levels(values, levels, params.sort())?);
    }

    let mut keys = Vec::with_capacity(params.by().len());
    let mut key_labels = Vec::new();
    for key in params.by() {
        let column = match key {
            ByKey::Column(name) => {
                let label = ColumnLabel::single(name.clone());
                let column = data.column(&label)?.clone();
                key_labels.push(label);
                column
            }
            ByKey::Series { .. } => external(key)?,
        };
        keys.push(KeyColumn::new(Some(key.name().to_string()), column));
    }

    let values = select(params, data.drop_columns(&key_labels))?;

    Ok(GroupedFrame::new(values, &keys, params.sort())?)
}

/// Run pre steps and the map side of every agg step over one grouped chunk.
pub(crate) fn map_partials(
    steps: &ReductionSteps,
    grouped: &GroupedFrame,
) -> Result<PartialTuple, InternalError> {
    let mut derived: HashMap<&StepKey, Frame> = HashMap::new();
    for step in steps.pre() {
        let frame = if step.is_selection() {
            grouped.data().select(&step.column_labels())?
        } else {
            let input = derived.get(&step.input_key).ok_or_else(|| missing(&step.input_key))?;
            step.transform.apply(input)?
        };
        derived.insert(&step.output_key, frame);
    }

    let mut partials = Vec::with_capacity(steps.partial_width());
    for step in steps.agg() {
        let input = derived.get(&step.input_key).ok_or_else(|| missing(&step.input_key))?;
        let data = grouped.with_data(input.clone())?;
        let frames = match &step.map {
            StepFunc::Builtin(stat) => vec![stat.apply(&data, step.kwargs)?],
            StepFunc::Custom(handle) => handle.handler().execute_map(step, &data)?,
        };
        check_width(step, frames.len())?;
        partials.extend(frames);
    }

    Ok(PartialTuple::new(partials))
}

pub(super) fn check_width(step: &AggStep, found: usize) -> Result<(), InternalError> {
    if found == step.output_count {
        return Ok(());
    }

    Err(InternalError::executor_invariant(format!(
        "step '{}' produced {found} partials, expected {}",
        step.output_key, step.output_count,
    )))
}

fn select(params: &GroupByParams, values: Frame) -> Result<Frame, InternalError> {
    match params.selection() {
        Some(selection) => {
            let labels: Vec<ColumnLabel> = selection
                .columns()
                .into_iter()
                .map(ColumnLabel::single)
                .collect();

            Ok(values.select(&labels)?)
        }
        None => Ok(values),
    }
}

// Values of a key series bound to one chunk of the external tileable.
fn series_keys(key: &ByKey, ctx: &dyn ExecutionContext) -> Result<Column, InternalError> {
    let ByKey::Series {
        name,
        source: KeySource::Chunk(chunk),
        ..
    } = key
    else {
        return Err(InternalError::executor_invariant(format!(
            "key '{}' is not bound to a chunk",
            key.name(),
        )));
    };

    let data = ctx.fetch(chunk)?;
    let frame = data.as_frame()?;
    frame.columns().first().cloned().ok_or_else(|| {
        InternalError::executor_invariant(format!("key series '{name}' chunk has no column"))
    })
}

fn missing(key: &StepKey) -> InternalError {
    InternalError::executor_invariant(format!("step input '{key}' was not computed"))
}
