//! Module: reduce::custom
//! Responsibility: pluggable reductions that do not decompose into builtin
//! statistics, and the registry that resolves them by name.
//! Does not own: step compilation or stage sequencing.
//! Boundary: resolved once at compile time into `StepFunc::Custom`.

use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    frame::{Column, Frame, FrameError, GroupedFrame},
    reduce::{AggStep, Statistic, reduce_groups},
    value::{DType, Value},
};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::Arc,
};

///
/// CustomAggregation
///
/// Stage hooks for one custom reduction. Map emits `output_count` partial
/// frames; combine consumes and re-emits that many; agg collapses them into
/// the final frame. Partials arrive regrouped by the stored index levels.
///

pub trait CustomAggregation: Send + Sync {
    fn name(&self) -> &'static str;

    fn output_count(&self) -> usize;

    fn execute_map(&self, step: &AggStep, data: &GroupedFrame)
    -> Result<Vec<Frame>, InternalError>;

    fn execute_combine(
        &self,
        step: &AggStep,
        partials: &[GroupedFrame],
    ) -> Result<Vec<Frame>, InternalError>;

    fn execute_agg(&self, step: &AggStep, partials: &[GroupedFrame])
    -> Result<Frame, InternalError>;
}

///
/// CustomHandle
///
/// Shared reference to one registered custom reduction. Handles compare by
/// name since the registry holds one handler per name.
///

#[derive(Clone)]
pub struct CustomHandle(Arc<dyn CustomAggregation>);

impl CustomHandle {
    pub fn new(handler: impl CustomAggregation + 'static) -> Self {
        Self(Arc::new(handler))
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    #[must_use]
    pub fn handler(&self) -> &dyn CustomAggregation {
        self.0.as_ref()
    }
}

impl fmt::Debug for CustomHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CustomHandle").field(&self.name()).finish()
    }
}

impl PartialEq for CustomHandle {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

///
/// CustomRegistry
///

#[derive(Clone, Debug, Default)]
pub struct CustomRegistry {
    handlers: BTreeMap<&'static str, CustomHandle>,
}

impl CustomRegistry {
    /// Registry with the shipped custom reductions.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        for handle in [CustomHandle::new(NUnique), CustomHandle::new(PeakToPeak)] {
            registry.handlers.insert(handle.name(), handle);
        }

        registry
    }

    pub fn register(&mut self, handler: impl CustomAggregation + 'static) -> Result<(), InternalError> {
        let handle = CustomHandle::new(handler);
        if self.handlers.contains_key(handle.name()) {
            return Err(InternalError::new(
                ErrorClass::InvalidInput,
                ErrorOrigin::Reduction,
                format!("custom aggregation '{}' is already registered", handle.name()),
            ));
        }
        self.handlers.insert(handle.name(), handle);

        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<CustomHandle> {
        self.handlers.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }
}

fn expect_partials<'a>(
    step: &AggStep,
    partials: &'a [GroupedFrame],
    count: usize,
) -> Result<&'a [GroupedFrame], InternalError> {
    if partials.len() != count {
        return Err(InternalError::reduction_invariant(format!(
            "custom step '{}' expects {count} partials, got {}",
            step.output_key,
            partials.len(),
        )));
    }

    Ok(partials)
}

// Union of the distinct non-missing values carried in `cells`, flattening list
// cells produced by an earlier stage.
fn distinct_union(cells: &[&Value]) -> BTreeSet<Value> {
    let mut distinct = BTreeSet::new();
    for cell in cells {
        match cell {
            Value::List(items) => distinct.extend(items.iter().filter(|v| !v.is_missing()).cloned()),
            missing if missing.is_missing() => {}
            other => {
                distinct.insert((*other).clone());
            }
        }
    }

    distinct
}

///
/// NUnique
///
/// Distinct non-null count. Partials carry the distinct set per group.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NUnique;

impl NUnique {
    fn distinct_sets(grouped: &GroupedFrame) -> Result<Frame, FrameError> {
        reduce_groups(
            grouped,
            |_| Ok(DType::List),
            |_, cells| Value::List(distinct_union(cells).into_iter().collect()),
        )
    }
}

impl CustomAggregation for NUnique {
    fn name(&self) -> &'static str {
        "nunique"
    }

    fn output_count(&self) -> usize {
        1
    }

    fn execute_map(&self, _: &AggStep, data: &GroupedFrame) -> Result<Vec<Frame>, InternalError> {
        Ok(vec![Self::distinct_sets(data)?])
    }

    fn execute_combine(
        &self,
        step: &AggStep,
        partials: &[GroupedFrame],
    ) -> Result<Vec<Frame>, InternalError> {
        let partials = expect_partials(step, partials, 1)?;

        Ok(vec![Self::distinct_sets(&partials[0])?])
    }

    fn execute_agg(&self, step: &AggStep, partials: &[GroupedFrame]) -> Result<Frame, InternalError> {
        let partials = expect_partials(step, partials, 1)?;
        let counts = reduce_groups(
            &partials[0],
            |_| Ok(DType::Int64),
            |_, cells| Value::Int(distinct_union(cells).len() as i64),
        )?;

        Ok(counts)
    }
}

///
/// PeakToPeak
///
/// `max - min` per group. Partials carry the running minimum and maximum.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct PeakToPeak;

impl PeakToPeak {
    fn bounds(min: &GroupedFrame, max: &GroupedFrame, step: &AggStep) -> Result<Vec<Frame>, InternalError> {
        Ok(vec![
            Statistic::Min.apply(min, step.kwargs)?,
            Statistic::Max.apply(max, step.kwargs)?,
        ])
    }
}

impl CustomAggregation for PeakToPeak {
    fn name(&self) -> &'static str {
        "ptp"
    }

    fn output_count(&self) -> usize {
        2
    }

    fn execute_map(&self, step: &AggStep, data: &GroupedFrame) -> Result<Vec<Frame>, InternalError> {
        Self::bounds(data, data, step)
    }

    fn execute_combine(
        &self,
        step: &AggStep,
        partials: &[GroupedFrame],
    ) -> Result<Vec<Frame>, InternalError> {
        let partials = expect_partials(step, partials, 2)?;

        Self::bounds(&partials[0], &partials[1], step)
    }

    fn execute_agg(&self, step: &AggStep, partials: &[GroupedFrame]) -> Result<Frame, InternalError> {
        let partials = expect_partials(step, partials, 2)?;
        let bounds = Self::bounds(&partials[0], &partials[1], step)?;
        let (min, max) = (&bounds[0], &bounds[1]);

        let mut columns = Vec::with_capacity(min.ncols());
        for (lo, hi) in min.columns().iter().zip(max.columns()) {
            let dtype = match lo.dtype() {
                DType::Int64 => DType::Int64,
                DType::Float64 => DType::Float64,
                other => {
                    return Err(FrameError::UnsupportedDType {
                        dtype: other,
                        operation: "ptp",
                    }
                    .into());
                }
            };
            let values = lo
                .values()
                .iter()
                .zip(hi.values())
                .map(|(lo, hi)| match (lo, hi) {
                    (Value::Int(lo), Value::Int(hi)) => Value::Int(hi.wrapping_sub(*lo)),
                    (lo, hi) => match (lo.as_f64(), hi.as_f64()) {
                        (Some(lo), Some(hi)) => Value::Float(hi - lo),
                        _ => Value::Null,
                    },
                })
                .collect();
            columns.push(Column::typed(dtype, values));
        }

        Ok(Frame::new(min.index().clone(), min.labels().to_vec(), columns)?)
    }
}
