//! Module: groupby
//! Responsibility: the logical group-by request and the operand model derived
//! from it.
//! Does not own: schema inference or graph construction (see `plan`).
//! Boundary: value types exchanged between planner, graph and executor.

mod func;
mod operand;
mod params;
mod schema;

#[cfg(test)]
mod tests;

pub use func::{ColumnFuncs, FuncSpec, GroupedInput, Layout, NamedAgg};
pub use operand::{AggregationOperand, OperandParts, Stage};
pub use params::{ByKey, GroupByParams, KeySource, Selection};
pub use schema::{ChunkRef, ColumnSchema, DataKind, InputSchema, OutputSchema, Tileable};

use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    reduce::AggKwargs,
};
use serde::{Deserialize, Serialize};

///
/// GroupByRequest
///
/// One `groupby(...).agg(...)` call over a chunked input. External key
/// series referenced by `params` are listed in `key_series`.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GroupByRequest {
    pub input: Tileable,
    #[serde(default)]
    pub key_series: Vec<Tileable>,
    pub params: GroupByParams,
    pub func: FuncSpec,
    #[serde(default)]
    pub kwargs: AggKwargs,
}

impl GroupByRequest {
    #[must_use]
    pub fn new(input: Tileable, params: GroupByParams, func: FuncSpec) -> Self {
        Self {
            input,
            key_series: Vec::new(),
            params,
            func,
            kwargs: AggKwargs::default(),
        }
    }

    #[must_use]
    pub fn with_key_series(mut self, series: Tileable) -> Self {
        self.key_series.push(series);
        self
    }

    pub fn key_series(&self, id: &str) -> Result<&Tileable, InternalError> {
        self.key_series
            .iter()
            .find(|series| series.id == id)
            .ok_or_else(|| {
                InternalError::new(
                    ErrorClass::NotFound,
                    ErrorOrigin::Planner,
                    format!("key series '{id}' is not part of the request"),
                )
            })
    }

    /// Value columns after key removal and selection.
    pub fn grouped_input(&self) -> Result<GroupedInput, InternalError> {
        let mut columns = self.input.schema.column_names();
        if self.params.level().is_none() {
            let keys: Vec<&str> = self
                .params
                .by()
                .iter()
                .filter(|key| matches!(key, ByKey::Column(_)))
                .map(ByKey::name)
                .collect();
            for key in &keys {
                if !columns.iter().any(|column| column == key) {
                    return Err(InternalError::new(
                        ErrorClass::NotFound,
                        ErrorOrigin::Planner,
                        format!("group key column '{key}' not found"),
                    ));
                }
            }
            columns.retain(|column| !keys.contains(&column.as_str()));
        }

        let mut ndim = self.input.ndim();
        if let Some(selection) = self.params.selection() {
            let selected = selection.columns();
            if let Some(missing) = selected.iter().find(|name| !columns.contains(name)) {
                return Err(InternalError::new(
                    ErrorClass::NotFound,
                    ErrorOrigin::Planner,
                    format!("selected column '{missing}' not found"),
                ));
            }
            columns = selected;
            if matches!(selection, Selection::Column(_)) {
                ndim = 1;
            }
        }

        Ok(GroupedInput { columns, ndim })
    }
}
