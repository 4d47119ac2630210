//! Module: reduce
//! Responsibility: the compiled reduction plan (pre / agg / post steps) and
//! the statistics and finalizers it references.
//! Does not own: chunk placement or stage sequencing.
//! Boundary: compiled once per request, read by every stage.

mod compiler;
mod custom;
mod post;
mod statistic;


pub use compiler::{DefaultReductionCompiler, ReductionCompiler, RequestedFunc};
pub use custom::{CustomAggregation, CustomHandle, CustomRegistry, NUnique, PeakToPeak};
pub use post::PostFunc;
pub use statistic::Statistic;

pub(crate) use statistic::reduce_groups;

use crate::{
    error::InternalError,
    frame::{Column, ColumnLabel, Frame, FrameError},
    value::{DType, Value},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt};

///
/// StepKey
///
/// Deterministic identifier of one intermediate result. Equal keys denote
/// equal computations.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StepKey(String);

impl StepKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

///
/// AggKwargs
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct AggKwargs {
    pub skipna: bool,
}

impl Default for AggKwargs {
    fn default() -> Self {
        Self { skipna: true }
    }
}

///
/// PreTransform
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PreTransform {
    Select,
    Power(u8),
}

impl PreTransform {
    /// Apply to already-selected value columns.
    pub fn apply(self, frame: &Frame) -> Result<Frame, FrameError> {
        match self {
            Self::Select => Ok(frame.clone()),
            Self::Power(exp) => frame.map_columns(|column| {
                if !column.dtype().is_numeric() {
                    return Err(FrameError::UnsupportedDType {
                        dtype: column.dtype(),
                        operation: "power",
                    });
                }
                let values = column
                    .values()
                    .iter()
                    .map(|value| {
                        value
                            .as_f64()
                            .map_or(Value::Null, |v| Value::Float(v.powi(i32::from(exp))))
                    })
                    .collect();
                Ok(Column::typed(DType::Float64, values))
            }),
        }
    }
}

impl fmt::Display for PreTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select => f.write_str("select"),
            Self::Power(exp) => write!(f, "pow{exp}"),
        }
    }
}

///
/// PreStep
///
/// `input_key == output_key` marks a plain selection of `columns` from the
/// grouped input; otherwise `transform` runs over the output of `input_key`.
///

#[derive(Clone, Debug, PartialEq)]
pub struct PreStep {
    pub input_key: StepKey,
    pub output_key: StepKey,
    pub columns: Vec<String>,
    pub transform: PreTransform,
}

impl PreStep {
    #[must_use]
    pub const fn is_selection(&self) -> bool {
        matches!(self.transform, PreTransform::Select)
    }

    #[must_use]
    pub fn column_labels(&self) -> Vec<ColumnLabel> {
        self.columns.iter().cloned().map(ColumnLabel::single).collect()
    }
}

///
/// StepFunc
///

#[derive(Clone, Debug, PartialEq)]
pub enum StepFunc {
    Builtin(Statistic),
    Custom(CustomHandle),
}

impl fmt::Display for StepFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(stat) => write!(f, "{stat}"),
            Self::Custom(handle) => f.write_str(handle.name()),
        }
    }
}

///
/// AggStep
///
/// One combinable reduction. `output_count` partial frames flow between
/// stages for this step; the agg stage collapses them into one.
///

#[derive(Clone, Debug, PartialEq)]
pub struct AggStep {
    pub input_key: StepKey,
    pub raw_name: String,
    pub map: StepFunc,
    pub agg: StepFunc,
    pub output_key: StepKey,
    pub output_count: usize,
    pub kwargs: AggKwargs,
}

impl AggStep {
    #[must_use]
    pub const fn is_custom(&self) -> bool {
        matches!(self.map, StepFunc::Custom(_))
    }
}

///
/// PostStep
///

#[derive(Clone, Debug, PartialEq)]
pub struct PostStep {
    pub input_keys: Vec<StepKey>,
    pub output_key: StepKey,
    pub display_name: String,
    pub columns: Vec<String>,
    pub finalize: PostFunc,
}

///
/// ReductionSteps
///
/// Validated reduction plan. Every agg input is produced by a pre step,
/// every post input by an agg step, and every produced key is consumed.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReductionSteps {
    pre: Vec<PreStep>,
    agg: Vec<AggStep>,
    post: Vec<PostStep>,
}

impl ReductionSteps {
    pub fn new(
        pre: Vec<PreStep>,
        agg: Vec<AggStep>,
        post: Vec<PostStep>,
    ) -> Result<Self, InternalError> {
        let steps = Self { pre, agg, post };
        steps.validate()?;

        Ok(steps)
    }

    #[must_use]
    pub fn pre(&self) -> &[PreStep] {
        &self.pre
    }

    #[must_use]
    pub fn agg(&self) -> &[AggStep] {
        &self.agg
    }

    #[must_use]
    pub fn post(&self) -> &[PostStep] {
        &self.post
    }

    /// Number of partial frames one partial tuple carries.
    #[must_use]
    pub fn partial_width(&self) -> usize {
        self.agg.iter().map(|step| step.output_count).sum()
    }

    pub fn validate(&self) -> Result<(), InternalError> {
        if self.post.is_empty() {
            return Err(InternalError::reduction_invariant(
                "reduction plan has no post steps",
            ));
        }

        // Phase 1: pre steps read the grouped input or an earlier pre step.
        let mut pre_keys = BTreeSet::new();
        for step in &self.pre {
            if step.input_key != step.output_key && !pre_keys.contains(&step.input_key) {
                return Err(dangling("pre", &step.input_key));
            }
            pre_keys.insert(step.output_key.clone());
        }

        // Phase 2: agg inputs resolve to pre outputs.
        let mut agg_keys = BTreeSet::new();
        for step in &self.agg {
            if !pre_keys.contains(&step.input_key) {
                return Err(dangling("agg", &step.input_key));
            }
            if step.output_count == 0 {
                return Err(InternalError::reduction_invariant(format!(
                    "agg step '{}' declares zero outputs",
                    step.output_key,
                )));
            }
            if !agg_keys.insert(step.output_key.clone()) {
                return Err(InternalError::reduction_invariant(format!(
                    "agg step '{}' is not deduplicated",
                    step.output_key,
                )));
            }
        }

        // Phase 3: post inputs resolve to agg outputs.
        for step in &self.post {
            if step.input_keys.len() != step.finalize.arity() {
                return Err(InternalError::reduction_invariant(format!(
                    "post step '{}' expects {} inputs, got {}",
                    step.output_key,
                    step.finalize.arity(),
                    step.input_keys.len(),
                )));
            }
            if let Some(key) = step.input_keys.iter().find(|key| !agg_keys.contains(key)) {
                return Err(dangling("post", key));
            }
        }

        // Phase 4: nothing produced is left unconsumed.
        let consumed_pre: BTreeSet<&StepKey> = self
            .agg
            .iter()
            .map(|step| &step.input_key)
            .chain(
                self.pre
                    .iter()
                    .filter(|step| step.input_key != step.output_key)
                    .map(|step| &step.input_key),
            )
            .collect();
        if let Some(key) = pre_keys.iter().find(|key| !consumed_pre.contains(key)) {
            return Err(unused(key));
        }
        let consumed_agg: BTreeSet<&StepKey> =
            self.post.iter().flat_map(|step| &step.input_keys).collect();
        if let Some(key) = agg_keys.iter().find(|key| !consumed_agg.contains(key)) {
            return Err(unused(key));
        }

        Ok(())
    }
}

fn dangling(kind: &str, key: &StepKey) -> InternalError {
    InternalError::reduction_invariant(format!("{kind} step reads unknown key '{key}'"))
}

fn unused(key: &StepKey) -> InternalError {
    InternalError::reduction_invariant(format!("step output '{key}' is never consumed"))
}
