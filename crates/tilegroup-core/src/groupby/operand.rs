//! Module: groupby::operand
//! Responsibility: the per-node aggregation operand and its stage derivations.
//! Does not own: graph placement or stage execution.
//! Boundary: cloned per node; clones share only the attached size recorder.

use crate::{
    groupby::{GroupByParams, OutputSchema},
    reduce::ReductionSteps,
    runtime::SizeRecorderHandle,
};
use std::{fmt, sync::Arc};
use tilegroup_config::AggregationConfig;

///
/// Stage
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Stage {
    Map,
    Combine,
    Reduce,
    Agg,
}

impl Stage {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Map => "map",
            Self::Combine => "combine",
            Self::Reduce => "reduce",
            Self::Agg => "agg",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

///
/// AggregationOperand
///
/// `params` is the effective grouping used for planning; `raw_params` keeps
/// the request as the user wrote it. `reset_output_index` decides whether the
/// agg stage moves key levels back into columns.
///

#[derive(Clone, Debug)]
pub struct AggregationOperand {
    stage: Option<Stage>,
    params: GroupByParams,
    raw_params: GroupByParams,
    steps: Arc<ReductionSteps>,
    index_levels: usize,
    combine_size: usize,
    chunk_store_limit: u64,
    reset_output_index: bool,
    schema: Arc<OutputSchema>,
    size_recorder: Option<SizeRecorderHandle>,
}

///
/// OperandParts
///
/// Planning facts an operand is built from.
///

#[derive(Clone, Debug)]
pub struct OperandParts {
    pub params: GroupByParams,
    pub raw_params: GroupByParams,
    pub steps: Arc<ReductionSteps>,
    pub schema: Arc<OutputSchema>,
    pub index_levels: usize,
    pub reset_output_index: bool,
}

impl AggregationOperand {
    #[must_use]
    pub fn new(parts: OperandParts, config: &AggregationConfig) -> Self {
        Self {
            stage: None,
            params: parts.params,
            raw_params: parts.raw_params,
            steps: parts.steps,
            index_levels: parts.index_levels.max(1),
            combine_size: config.combine_size(),
            chunk_store_limit: config.chunk_store_limit(),
            reset_output_index: parts.reset_output_index,
            schema: parts.schema,
            size_recorder: None,
        }
    }

    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        self.stage
    }

    #[must_use]
    pub const fn params(&self) -> &GroupByParams {
        &self.params
    }

    #[must_use]
    pub const fn raw_params(&self) -> &GroupByParams {
        &self.raw_params
    }

    #[must_use]
    pub fn steps(&self) -> &ReductionSteps {
        &self.steps
    }

    #[must_use]
    pub const fn index_levels(&self) -> usize {
        self.index_levels
    }

    #[must_use]
    pub const fn combine_size(&self) -> usize {
        self.combine_size
    }

    #[must_use]
    pub const fn chunk_store_limit(&self) -> u64 {
        self.chunk_store_limit
    }

    #[must_use]
    pub const fn reset_output_index(&self) -> bool {
        self.reset_output_index
    }

    #[must_use]
    pub fn schema(&self) -> &OutputSchema {
        &self.schema
    }

    #[must_use]
    pub const fn size_recorder(&self) -> Option<&SizeRecorderHandle> {
        self.size_recorder.as_ref()
    }

    /// Map-stage clone grouping with `params` (already bound to this chunk's
    /// key series, if any).
    #[must_use]
    pub fn for_map(&self, params: GroupByParams) -> Self {
        Self {
            stage: Some(Stage::Map),
            params,
            size_recorder: None,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn for_combine(&self) -> Self {
        self.regrouped(Stage::Combine)
    }

    #[must_use]
    pub fn for_agg(&self) -> Self {
        self.regrouped(Stage::Agg)
    }

    #[must_use]
    pub fn with_size_recorder(&self, recorder: SizeRecorderHandle) -> Self {
        Self {
            size_recorder: Some(recorder),
            ..self.clone()
        }
    }

    // Later stages regroup keyed partials by index level.
    fn regrouped(&self, stage: Stage) -> Self {
        Self {
            stage: Some(stage),
            params: self.params.with_levels(self.index_levels),
            size_recorder: None,
            ..self.clone()
        }
    }
}
