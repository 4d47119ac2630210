//! Module: plan::mock
//! Responsibility: output schema inference by executing map and agg over a
//! small synthetic sample of the input.
//! Does not own: the stage semantics it runs (see `exec`).
//! Boundary: the only place where `as_index` is reinterpreted.

use crate::{
    error::InternalError,
    exec::{aggregate_partials, group_input, map_partials},
    frame::{Column, ColumnLabel, Frame, FrameError, Index},
    groupby::{
        AggregationOperand, ByKey, DataKind, GroupByParams, GroupByRequest, InputSchema, Layout,
        OperandParts, OutputSchema,
    },
    reduce::{ReductionCompiler, ReductionSteps},
    value::{DType, KeyTuple},
};
use log::debug;
use std::sync::Arc;
use tilegroup_config::AggregationConfig;

///
/// SchemaInference
///
/// What the mock run established. `params` carries the effective `as_index`;
/// the caller's flag survives only through `reset_output_index`.
///

#[derive(Clone, Debug)]
pub struct SchemaInference {
    pub steps: Arc<ReductionSteps>,
    pub schema: Arc<OutputSchema>,
    pub params: GroupByParams,
    pub index_levels: usize,
    pub reset_output_index: bool,
    pub retried: bool,
}

pub(super) fn infer<C: ReductionCompiler>(
    request: &GroupByRequest,
    compiler: &C,
    config: &AggregationConfig,
) -> Result<SchemaInference, InternalError> {
    let grouped = request.grouped_input()?;
    let layout = request.func.layout(&grouped)?;
    let funcs = request.func.requested(&grouped, request.kwargs)?;
    let steps = Arc::new(compiler.compile(&funcs, grouped.ndim)?);

    let mock = MockRun {
        request,
        layout: &layout,
        steps: &steps,
        config,
    };

    let raw = &request.params;
    let (result, retried) = match mock.run(raw) {
        Ok(result) => (result, false),
        Err(err) if !raw.as_index() && request.func.is_keyed_by_column() => {
            debug!(
                "groupby '{}': mock failed with as_index=false ({err}), retrying as index",
                request.input.id,
            );
            let result = mock.run(&raw.with_as_index(true))?;
            let index = result.index().strip_names();

            (result.with_index(index)?, true)
        }
        Err(err) => return Err(err),
    };

    let index = result.index();
    let index_levels = index.nlevels().max(1);
    let as_index = raw.as_index()
        || layout.kind == DataKind::Series
        || index_levels > 1
        || retried;
    let reset_output_index = !raw.as_index() && layout.kind == DataKind::Frame && !retried;

    let dtypes = result.columns().iter().map(Column::dtype).collect();
    let schema = OutputSchema::new(
        layout.kind,
        layout.columns.clone(),
        dtypes,
        layout.name.clone(),
        index.names().to_vec(),
        index.dtypes().to_vec(),
    );

    debug!(
        "groupby '{}': mock inferred {} columns, index_levels={index_levels}, \
         as_index={as_index}, reset={reset_output_index}",
        request.input.id,
        schema.columns().len(),
    );

    Ok(SchemaInference {
        steps,
        schema: Arc::new(schema),
        params: raw.with_as_index(as_index),
        index_levels,
        reset_output_index,
        retried,
    })
}

///
/// MockRun
///

struct MockRun<'a> {
    request: &'a GroupByRequest,
    layout: &'a Layout,
    steps: &'a Arc<ReductionSteps>,
    config: &'a AggregationConfig,
}

impl MockRun<'_> {
    // Map then agg over the sample; key names must not collide with value
    // labels when keys are to become columns.
    fn run(&self, params: &GroupByParams) -> Result<Frame, InternalError> {
        self.try_run(params).map_err(InternalError::into_mock)
    }

    fn try_run(&self, params: &GroupByParams) -> Result<Frame, InternalError> {
        let rows = self.config.mock_sample_rows();
        let data = sample_frame(&self.request.input.schema, rows)?;

        let grouped = group_input(params, &data, |key| Ok(sample_series(key, rows)))?;
        let partials = map_partials(self.steps, &grouped)?;

        let provisional = OutputSchema::new(
            self.layout.kind,
            self.layout.columns.clone(),
            vec![DType::Object; self.layout.columns.len()],
            self.layout.name.clone(),
            Vec::new(),
            Vec::new(),
        );
        let operand = AggregationOperand::new(
            OperandParts {
                params: params.clone(),
                raw_params: params.clone(),
                steps: Arc::clone(self.steps),
                schema: Arc::new(provisional),
                index_levels: grouped.groups().names().len(),
                reset_output_index: false,
            },
            self.config,
        )
        .for_agg();
        let result = aggregate_partials(&operand, &partials)?;

        if !params.as_index() && self.layout.kind == DataKind::Frame {
            check_key_collisions(&result)?;
        }

        Ok(result)
    }
}

fn check_key_collisions(result: &Frame) -> Result<(), FrameError> {
    let nlevels = result.column_nlevels();
    for level in 0..result.index().nlevels() {
        let name = result.index().level_name(level);
        if result.position(&ColumnLabel::single(name.clone()).padded(nlevels)).is_some() {
            return Err(FrameError::DuplicateColumn { label: name });
        }
    }

    Ok(())
}

/// Representative rows for every declared column and index level.
fn sample_frame(schema: &InputSchema, rows: usize) -> Result<Frame, FrameError> {
    let (names, dtypes) = schema.index_levels();
    let keys: Vec<KeyTuple> = (0..rows)
        .map(|row| dtypes.iter().map(|dtype| dtype.sample_value(row)).collect())
        .collect();
    let index = Index::new(names, dtypes, keys)?;

    let labels = schema
        .columns
        .iter()
        .map(|column| ColumnLabel::single(column.name.clone()))
        .collect();
    let columns = schema
        .columns
        .iter()
        .map(|column| sample_column(column.dtype, rows))
        .collect();

    Frame::new(index, labels, columns)
}

fn sample_series(key: &ByKey, rows: usize) -> Column {
    let dtype = match key {
        ByKey::Series { dtype, .. } => *dtype,
        ByKey::Column(_) => DType::Object,
    };

    sample_column(dtype, rows)
}

fn sample_column(dtype: DType, rows: usize) -> Column {
    Column::typed(dtype, (0..rows).map(|row| dtype.sample_value(row)).collect())
}
