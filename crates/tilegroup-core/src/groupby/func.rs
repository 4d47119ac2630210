//! Module: groupby::func
//! Responsibility: user function specification and the column layout it
//! implies for the final result.
//! Does not own: function decomposition (see `reduce::compiler`).
//! Boundary: turns one request into requested functions plus a target layout.

use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    frame::ColumnLabel,
    groupby::DataKind,
    reduce::{AggKwargs, RequestedFunc},
};
use serde::{Deserialize, Serialize};

///
/// ColumnFuncs
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnFuncs {
    One(String),
    Many(Vec<String>),
}

///
/// NamedAgg
///
/// `alias = func(column)`. `column` is ignored for one-dimensional input.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct NamedAgg {
    pub alias: String,
    #[serde(default)]
    pub column: Option<String>,
    pub func: String,
}

impl NamedAgg {
    #[must_use]
    pub fn new(alias: impl Into<String>, column: impl Into<String>, func: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            column: Some(column.into()),
            func: func.into(),
        }
    }
}

///
/// FuncSpec
///
/// Single   → "sum"
/// List     → ["sum", "mean"]
/// PerColumn → [["v", "sum"], ["w", ["min", "max"]]]
/// Named    → [{"alias": "total", "column": "v", "func": "sum"}]
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FuncSpec {
    Single(String),
    List(Vec<String>),
    PerColumn(Vec<(String, ColumnFuncs)>),
    Named(Vec<NamedAgg>),
}

///
/// Layout
///
/// Result shape a function spec implies before any key columns are added.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Layout {
    pub kind: DataKind,
    pub columns: Vec<ColumnLabel>,
    pub name: Option<String>,
}

///
/// GroupedInput
///
/// Value columns visible after key removal and selection, and whether they
/// form a one-dimensional (series) input.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GroupedInput {
    pub columns: Vec<String>,
    pub ndim: usize,
}

impl GroupedInput {
    fn series_name(&self) -> Result<&str, InternalError> {
        match self.columns.as_slice() {
            [name] => Ok(name),
            other => Err(invalid(format!(
                "one-dimensional input must have exactly one column, found {}",
                other.len(),
            ))),
        }
    }

    fn check_column(&self, column: &str) -> Result<(), InternalError> {
        if self.columns.iter().any(|candidate| candidate == column) {
            return Ok(());
        }

        Err(InternalError::new(
            ErrorClass::NotFound,
            ErrorOrigin::Planner,
            format!("aggregated column '{column}' not found"),
        ))
    }
}

fn invalid(message: String) -> InternalError {
    InternalError::planner_invalid(message)
}

fn unsupported_nested() -> InternalError {
    InternalError::new(
        ErrorClass::Unsupported,
        ErrorOrigin::Planner,
        "per-column functions are not supported on one-dimensional input",
    )
}

impl FuncSpec {
    /// Requested functions in output order.
    pub fn requested(
        &self,
        input: &GroupedInput,
        kwargs: AggKwargs,
    ) -> Result<Vec<RequestedFunc>, InternalError> {
        let one_dim = input.ndim == 1;
        let all = input.columns.clone();
        let request = |func: &str, columns: Vec<String>| {
            RequestedFunc::new(func, columns).with_kwargs(kwargs)
        };

        let funcs = match self {
            Self::Single(func) if func == "size" && !one_dim => vec![request(func, Vec::new())],
            Self::Single(func) => vec![request(func, all)],
            Self::List(funcs) => {
                if funcs.is_empty() {
                    return Err(invalid("function list is empty".to_string()));
                }
                funcs.iter().map(|func| request(func, all.clone())).collect()
            }
            Self::PerColumn(_) if one_dim => return Err(unsupported_nested()),
            Self::PerColumn(entries) => {
                let mut funcs = Vec::new();
                for (column, spec) in entries {
                    input.check_column(column)?;
                    let names = match spec {
                        ColumnFuncs::One(func) => std::slice::from_ref(func),
                        ColumnFuncs::Many(funcs) => funcs.as_slice(),
                    };
                    funcs.extend(names.iter().map(|func| request(func, vec![column.clone()])));
                }
                funcs
            }
            Self::Named(aggs) => {
                let mut funcs = Vec::with_capacity(aggs.len());
                for agg in aggs {
                    let columns = if one_dim {
                        all.clone()
                    } else {
                        let column = agg.column.as_deref().ok_or_else(|| {
                            invalid(format!("named aggregation '{}' has no column", agg.alias))
                        })?;
                        input.check_column(column)?;
                        vec![column.to_string()]
                    };
                    funcs.push(request(&agg.func, columns).with_display_name(agg.alias.clone()));
                }
                funcs
            }
        };

        Ok(funcs)
    }

    /// Target layout of the aggregated values.
    pub fn layout(&self, input: &GroupedInput) -> Result<Layout, InternalError> {
        let frame = |columns: Vec<ColumnLabel>| Layout {
            kind: DataKind::Frame,
            columns,
            name: None,
        };
        let series = |name: &str| Layout {
            kind: DataKind::Series,
            columns: vec![ColumnLabel::single(name)],
            name: Some(name.to_string()),
        };

        if input.ndim == 1 {
            let name = input.series_name()?;
            return match self {
                Self::Single(_) => Ok(series(name)),
                Self::List(funcs) => Ok(frame(funcs.iter().cloned().map(ColumnLabel::single).collect())),
                Self::Named(aggs) => Ok(frame(
                    aggs.iter().map(|agg| ColumnLabel::single(agg.alias.clone())).collect(),
                )),
                Self::PerColumn(_) => Err(unsupported_nested()),
            };
        }

        let layout = match self {
            Self::Single(func) if func == "size" => series("size"),
            Self::Single(_) => frame(input.columns.iter().cloned().map(ColumnLabel::single).collect()),
            Self::List(funcs) => frame(
                input
                    .columns
                    .iter()
                    .flat_map(|column| funcs.iter().map(move |func| ColumnLabel::multi([column, func])))
                    .collect(),
            ),
            Self::PerColumn(entries) => {
                let nested = entries
                    .iter()
                    .any(|(_, spec)| matches!(spec, ColumnFuncs::Many(_)));
                let mut columns = Vec::new();
                for (column, spec) in entries {
                    match spec {
                        ColumnFuncs::One(func) if nested => {
                            columns.push(ColumnLabel::multi([column, func]));
                        }
                        ColumnFuncs::One(_) => columns.push(ColumnLabel::single(column.clone())),
                        ColumnFuncs::Many(funcs) => columns.extend(
                            funcs.iter().map(|func| ColumnLabel::multi([column, func])),
                        ),
                    }
                }
                frame(columns)
            }
            Self::Named(aggs) => frame(
                aggs.iter()
                    .map(|agg| ColumnLabel::single(agg.alias.clone()))
                    .collect(),
            ),
        };

        Ok(layout)
    }

    /// Per-column and named specs may need the as-index retry.
    #[must_use]
    pub const fn is_keyed_by_column(&self) -> bool {
        matches!(self, Self::PerColumn(_) | Self::Named(_))
    }
}
