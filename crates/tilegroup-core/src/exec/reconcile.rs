//! Module: exec::reconcile
//! Responsibility: conform independently computed post outputs to the
//! declared output schema.
//! Does not own: schema inference.
//! Boundary: last transformation before an agg chunk is stored.

use crate::{
    frame::{ColumnLabel, Frame, FrameError},
    groupby::{DataKind, OutputSchema},
};

/// Assemble post outputs `(display_name, frame)` into the final result.
pub(super) fn conform(
    schema: &OutputSchema,
    reset_index: bool,
    outputs: Vec<(&str, Frame)>,
) -> Result<Frame, FrameError> {
    match schema.kind() {
        DataKind::Series => conform_series(schema, outputs),
        DataKind::Frame => conform_frame(schema, reset_index, outputs),
    }
}

fn conform_series(schema: &OutputSchema, outputs: Vec<(&str, Frame)>) -> Result<Frame, FrameError> {
    let label = schema
        .name()
        .map(ColumnLabel::single)
        .or_else(|| schema.columns().first().cloned())
        .unwrap_or_else(|| ColumnLabel::single(""));

    let mut parts = Vec::with_capacity(outputs.len());
    for (display, frame) in outputs {
        let first = frame
            .labels()
            .first()
            .cloned()
            .ok_or_else(|| FrameError::ColumnNotFound {
                label: display.to_string(),
            })?;
        parts.push(frame.select(&[first])?.with_labels(vec![label.clone()])?);
    }

    let result = rename_index(schema, Frame::concat_rows(&parts)?)?;
    if result.nrows() == 0 {
        return cast_empty(schema, result);
    }

    Ok(result)
}

fn conform_frame(
    schema: &OutputSchema,
    reset_index: bool,
    outputs: Vec<(&str, Frame)>,
) -> Result<Frame, FrameError> {
    let target = schema.columns();
    let target_levels = schema.column_levels();

    let mut parts = Vec::with_capacity(outputs.len());
    for (display, frame) in outputs {
        let relabeled = if target_levels > frame.column_nlevels() {
            let labels = frame
                .labels()
                .iter()
                .map(|label| label.with_level(display))
                .collect();
            frame.with_labels(labels)?
        } else if frame.ncols() == 1 && target.contains(&ColumnLabel::single(display)) {
            frame.with_labels(vec![ColumnLabel::single(display)])?
        } else {
            frame
        };
        parts.push(relabeled);
    }

    let combined = Frame::concat_columns(&parts)?;
    let computed_levels = combined.column_nlevels();

    // A plain reindex against repeated labels would resolve every repeat to
    // the first column.
    let mut result = if schema.has_duplicate_columns() {
        combined.select_duplicates(target)?
    } else {
        combined.reindex_columns(target)
    };
    result = rename_index(schema, result)?;

    if result.nrows() == 0 {
        result = cast_empty(schema, result)?;
    }
    if reset_index && computed_levels == target_levels {
        result = result.reset_index()?;
    }

    Ok(result)
}

// Key levels take the declared names; inference may have cleared them.
fn rename_index(schema: &OutputSchema, frame: Frame) -> Result<Frame, FrameError> {
    let names = schema.index_names();
    if names.len() != frame.index().nlevels() || names == frame.index().names() {
        return Ok(frame);
    }

    let index = frame.index().with_names(names.to_vec())?;
    frame.with_index(index)
}

// Zero rows carry no dtype evidence; restore the inferred dtypes.
fn cast_empty(schema: &OutputSchema, frame: Frame) -> Result<Frame, FrameError> {
    let frame = if schema.dtypes().len() == frame.ncols() {
        frame.cast_columns(schema.dtypes())?
    } else {
        frame
    };

    if schema.index_dtypes().len() == frame.index().nlevels() {
        frame.cast_index(schema.index_dtypes())
    } else {
        Ok(frame)
    }
}
