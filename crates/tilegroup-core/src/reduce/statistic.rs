//! Module: reduce::statistic
//! Responsibility: closed set of combinable per-group statistics.
//! Does not own: multi-step decomposition (see `compiler`).
//! Boundary: local aggregation primitive over one grouped frame.

use crate::{
    frame::{Column, ColumnLabel, Frame, FrameError, GroupedFrame},
    reduce::AggKwargs,
    value::{DType, Value},
};
use std::fmt;

///
/// Statistic
///
/// Every variant is associative: applying it to partial results of itself
/// (or, for `Count`/`Size`, summing them) yields the whole-input result.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Statistic {
    Sum,
    Prod,
    Min,
    Max,
    Count,
    Size,
    Any,
    All,
}

impl Statistic {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let stat = match name {
            "sum" => Self::Sum,
            "prod" | "product" => Self::Prod,
            "min" => Self::Min,
            "max" => Self::Max,
            "count" => Self::Count,
            "size" => Self::Size,
            "any" => Self::Any,
            "all" => Self::All,
            _ => return None,
        };

        Some(stat)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Prod => "prod",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
            Self::Size => "size",
            Self::Any => "any",
            Self::All => "all",
        }
    }

    /// Statistic that merges partial results of `self`.
    #[must_use]
    pub const fn merge_statistic(self) -> Self {
        match self {
            Self::Count | Self::Size => Self::Sum,
            other => other,
        }
    }

    pub fn output_dtype(self, input: DType) -> Result<DType, FrameError> {
        let dtype = match (self, input) {
            (Self::Count | Self::Size, _) => DType::Int64,
            (Self::Any | Self::All, _) => DType::Bool,
            (Self::Sum | Self::Prod, DType::Bool | DType::Int64) => DType::Int64,
            (Self::Sum | Self::Prod, DType::Float64) => DType::Float64,
            (Self::Min | Self::Max, DType::Bool | DType::Int64 | DType::Float64 | DType::Text) => {
                input
            }
            (_, dtype) => {
                return Err(FrameError::UnsupportedDType {
                    dtype,
                    operation: self.name(),
                });
            }
        };

        Ok(dtype)
    }

    /// One output row per group, one output column per value column. `Size`
    /// over a frame without value columns emits a single `size` column.
    pub fn apply(self, grouped: &GroupedFrame, kwargs: AggKwargs) -> Result<Frame, FrameError> {
        if self == Self::Size && grouped.data().ncols() == 0 {
            let sizes = grouped
                .groups()
                .rows()
                .iter()
                .map(|rows| Value::Int(rows.len() as i64))
                .collect();

            return Frame::new(
                grouped.groups().key_index()?,
                vec![ColumnLabel::single("size")],
                vec![Column::typed(DType::Int64, sizes)],
            );
        }

        reduce_groups(
            grouped,
            |dtype| self.output_dtype(dtype),
            |dtype, cells| self.reduce(dtype, cells, kwargs),
        )
    }

    fn reduce(self, output: DType, cells: &[&Value], kwargs: AggKwargs) -> Value {
        let has_null = cells.iter().any(|cell| cell.is_missing());
        let present = || cells.iter().copied().filter(|cell| !cell.is_missing());

        match self {
            Self::Count => Value::Int(present().count() as i64),
            Self::Size => Value::Int(cells.len() as i64),
            Self::Any => Value::Bool(present().any(Value::is_truthy)),
            Self::All => Value::Bool(present().all(Value::is_truthy)),
            _ if has_null && !kwargs.skipna => Value::Null,
            Self::Sum => fold_numeric(output, present(), 0, 0.0, i64::wrapping_add, |a, b| a + b),
            Self::Prod => fold_numeric(output, present(), 1, 1.0, i64::wrapping_mul, |a, b| a * b),
            Self::Min => present().min().cloned().unwrap_or(Value::Null),
            Self::Max => present().max().cloned().unwrap_or(Value::Null),
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn fold_numeric<'a>(
    output: DType,
    cells: impl Iterator<Item = &'a Value>,
    int_init: i64,
    float_init: f64,
    int_op: fn(i64, i64) -> i64,
    float_op: fn(f64, f64) -> f64,
) -> Value {
    if output == DType::Int64 {
        let total = cells.fold(int_init, |acc, cell| match cell {
            Value::Int(v) => int_op(acc, *v),
            Value::Bool(v) => int_op(acc, i64::from(*v)),
            _ => acc,
        });
        return Value::Int(total);
    }

    Value::Float(cells.filter_map(Value::as_f64).fold(float_init, float_op))
}

/// Reduce every value column group-wise through `reduce`, typing each output
/// column through `output_dtype`.
pub(crate) fn reduce_groups<D, F>(
    grouped: &GroupedFrame,
    output_dtype: D,
    reduce: F,
) -> Result<Frame, FrameError>
where
    D: Fn(DType) -> Result<DType, FrameError>,
    F: Fn(DType, &[&Value]) -> Value,
{
    let groups = grouped.groups();
    let data = grouped.data();
    let mut columns = Vec::with_capacity(data.ncols());

    for column in data.columns() {
        let dtype = output_dtype(column.dtype())?;
        let values = groups
            .rows()
            .iter()
            .map(|rows| {
                let cells: Vec<&Value> = rows.iter().map(|&row| &column.values()[row]).collect();
                reduce(dtype, &cells)
            })
            .collect();
        columns.push(Column::typed(dtype, values));
    }

    Frame::new(groups.key_index()?, data.labels().to_vec(), columns)
}
