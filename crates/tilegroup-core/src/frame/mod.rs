//! Module: frame
//! Responsibility: in-memory columnar frames, labels and row-index primitives.
//! Does not own: grouping policy or aggregation semantics.
//! Boundary: local data model every stage reads and writes.

mod concat;
mod group;
mod index;
mod size;

#[cfg(test)]
mod tests;

pub use group::{GroupedFrame, Groups, KeyColumn};
pub use index::Index;

use crate::value::{DType, Value};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt};
use thiserror::Error as ThisError;

///
/// FrameError
///

#[derive(Debug, ThisError)]
pub enum FrameError {
    #[error("column '{label}' not found")]
    ColumnNotFound { label: String },

    #[error("index level {level} not found (index has {available} levels)")]
    IndexLevelNotFound { level: usize, available: usize },

    #[error("dtype {dtype} is not supported by {operation}")]
    UnsupportedDType {
        dtype: DType,
        operation: &'static str,
    },

    #[error("column '{label}' already exists")]
    DuplicateColumn { label: String },

    #[error("length mismatch: expected {expected}, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("level mismatch: expected {expected} levels, found {found}")]
    LevelMismatch { expected: usize, found: usize },
}

///
/// ColumnLabel
///
/// Ordered level names of one column. Single-level labels carry one name.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ColumnLabel(Vec<String>);

impl ColumnLabel {
    #[must_use]
    pub fn single(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    #[must_use]
    pub fn multi<I, S>(levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(levels.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn levels(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub const fn nlevels(&self) -> usize {
        self.0.len()
    }

    /// Outermost level name, empty for a zero-level label.
    #[must_use]
    pub fn first(&self) -> &str {
        self.0.first().map_or("", String::as_str)
    }

    /// Derive a label with one more inner level appended.
    #[must_use]
    pub fn with_level(&self, level: impl Into<String>) -> Self {
        let mut levels = self.0.clone();
        levels.push(level.into());

        Self(levels)
    }

    /// Pad with empty inner levels up to `nlevels`.
    #[must_use]
    pub fn padded(&self, nlevels: usize) -> Self {
        let mut levels = self.0.clone();
        while levels.len() < nlevels {
            levels.push(String::new());
        }

        Self(levels)
    }
}

impl fmt::Display for ColumnLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [single] = self.0.as_slice() {
            return f.write_str(single);
        }

        write!(f, "({})", self.0.join(", "))
    }
}

impl From<&str> for ColumnLabel {
    fn from(value: &str) -> Self {
        Self::single(value)
    }
}

impl From<String> for ColumnLabel {
    fn from(value: String) -> Self {
        Self::single(value)
    }
}

///
/// Column
///

#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    dtype: DType,
    values: Vec<Value>,
}

impl Column {
    /// Build a column whose dtype is inferred from its values.
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            dtype: DType::infer(&values),
            values,
        }
    }

    #[must_use]
    pub const fn typed(dtype: DType, values: Vec<Value>) -> Self {
        Self { dtype, values }
    }

    #[must_use]
    pub fn nulls(dtype: DType, len: usize) -> Self {
        Self::typed(dtype, vec![Value::Null; len])
    }

    #[must_use]
    pub const fn dtype(&self) -> DType {
        self.dtype
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn take(&self, rows: &[usize]) -> Self {
        let values = rows
            .iter()
            .map(|&row| self.values.get(row).cloned().unwrap_or(Value::Null))
            .collect();

        Self::typed(self.dtype, values)
    }

    /// Convert every value to `dtype`.
    pub fn cast(&self, dtype: DType) -> Result<Self, FrameError> {
        if dtype == self.dtype {
            return Ok(self.clone());
        }

        let values = self
            .values
            .iter()
            .map(|value| {
                value.cast(dtype).ok_or(FrameError::UnsupportedDType {
                    dtype: value.dtype(),
                    operation: "cast",
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::typed(dtype, values))
    }
}

///
/// Frame
///
/// Row index plus labelled, typed columns. Labels may repeat; lookups by
/// label resolve to the first match unless stated otherwise.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    index: Index,
    labels: Vec<ColumnLabel>,
    columns: Vec<Column>,
}

impl Frame {
    pub fn new(
        index: Index,
        labels: Vec<ColumnLabel>,
        columns: Vec<Column>,
    ) -> Result<Self, FrameError> {
        if labels.len() != columns.len() {
            return Err(FrameError::LengthMismatch {
                expected: labels.len(),
                found: columns.len(),
            });
        }
        if let Some(column) = columns.iter().find(|column| column.len() != index.len()) {
            return Err(FrameError::LengthMismatch {
                expected: index.len(),
                found: column.len(),
            });
        }

        Ok(Self {
            index,
            labels,
            columns,
        })
    }

    /// Build a frame over a range index from named value vectors.
    pub fn from_columns<I, S>(columns: I) -> Result<Self, FrameError>
    where
        I: IntoIterator<Item = (S, Vec<Value>)>,
        S: Into<String>,
    {
        let (labels, columns): (Vec<_>, Vec<_>) = columns
            .into_iter()
            .map(|(name, values)| (ColumnLabel::single(name), Column::new(values)))
            .unzip();
        let rows = columns.first().map_or(0, Column::len);

        Self::new(Index::range(rows), labels, columns)
    }

    /// Frame with an index and no columns.
    #[must_use]
    pub const fn empty(index: Index) -> Self {
        Self {
            index,
            labels: Vec::new(),
            columns: Vec::new(),
        }
    }

    #[must_use]
    pub const fn index(&self) -> &Index {
        &self.index
    }

    #[must_use]
    pub fn labels(&self) -> &[ColumnLabel] {
        &self.labels
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub const fn nrows(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub const fn ncols(&self) -> usize {
        self.columns.len()
    }

    /// Number of column label levels, 1 for a frame with no columns.
    #[must_use]
    pub fn column_nlevels(&self) -> usize {
        self.labels
            .iter()
            .map(ColumnLabel::nlevels)
            .max()
            .unwrap_or(1)
    }

    #[must_use]
    pub fn position(&self, label: &ColumnLabel) -> Option<usize> {
        self.labels.iter().position(|candidate| candidate == label)
    }

    pub fn column(&self, label: &ColumnLabel) -> Result<&Column, FrameError> {
        self.position(label)
            .map(|pos| &self.columns[pos])
            .ok_or_else(|| FrameError::ColumnNotFound {
                label: label.to_string(),
            })
    }

    /// Select columns by label, first match per requested label.
    pub fn select(&self, labels: &[ColumnLabel]) -> Result<Self, FrameError> {
        let mut columns = Vec::with_capacity(labels.len());
        for label in labels {
            columns.push(self.column(label)?.clone());
        }

        Ok(Self {
            index: self.index.clone(),
            labels: labels.to_vec(),
            columns,
        })
    }

    /// Select columns when `labels` repeats entries: the k-th request for a
    /// label takes the k-th column carrying it.
    pub fn select_duplicates(&self, labels: &[ColumnLabel]) -> Result<Self, FrameError> {
        let mut seen: HashMap<&ColumnLabel, usize> = HashMap::new();
        let mut columns = Vec::with_capacity(labels.len());

        for label in labels {
            let ordinal = seen.entry(label).or_insert(0);
            let pos = self
                .labels
                .iter()
                .enumerate()
                .filter(|(_, candidate)| *candidate == label)
                .nth(*ordinal)
                .map(|(pos, _)| pos)
                .ok_or_else(|| FrameError::ColumnNotFound {
                    label: label.to_string(),
                })?;
            *ordinal += 1;
            columns.push(self.columns[pos].clone());
        }

        Ok(Self {
            index: self.index.clone(),
            labels: labels.to_vec(),
            columns,
        })
    }

    /// Conform to `labels`; absent labels become all-null object columns.
    #[must_use]
    pub fn reindex_columns(&self, labels: &[ColumnLabel]) -> Self {
        let columns = labels
            .iter()
            .map(|label| {
                self.position(label).map_or_else(
                    || Column::nulls(DType::Object, self.nrows()),
                    |pos| self.columns[pos].clone(),
                )
            })
            .collect();

        Self {
            index: self.index.clone(),
            labels: labels.to_vec(),
            columns,
        }
    }

    /// Drop every column whose label is listed.
    #[must_use]
    pub fn drop_columns(&self, labels: &[ColumnLabel]) -> Self {
        let (labels, columns) = self
            .labels
            .iter()
            .zip(&self.columns)
            .filter(|(label, _)| !labels.contains(label))
            .map(|(label, column)| (label.clone(), column.clone()))
            .unzip();

        Self {
            index: self.index.clone(),
            labels,
            columns,
        }
    }

    pub fn insert_column(
        &mut self,
        pos: usize,
        label: ColumnLabel,
        column: Column,
    ) -> Result<(), FrameError> {
        if self.position(&label).is_some() {
            return Err(FrameError::DuplicateColumn {
                label: label.to_string(),
            });
        }
        if column.len() != self.nrows() {
            return Err(FrameError::LengthMismatch {
                expected: self.nrows(),
                found: column.len(),
            });
        }

        let pos = pos.min(self.columns.len());
        self.labels.insert(pos, label);
        self.columns.insert(pos, column);

        Ok(())
    }

    pub fn with_labels(self, labels: Vec<ColumnLabel>) -> Result<Self, FrameError> {
        Self::new(self.index, labels, self.columns)
    }

    pub fn with_index(self, index: Index) -> Result<Self, FrameError> {
        Self::new(index, self.labels, self.columns)
    }

    /// Replace every column through `f`, keeping labels and index.
    pub fn map_columns<F>(&self, mut f: F) -> Result<Self, FrameError>
    where
        F: FnMut(&Column) -> Result<Column, FrameError>,
    {
        let columns = self
            .columns
            .iter()
            .map(&mut f)
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(self.index.clone(), self.labels.clone(), columns)
    }

    #[must_use]
    pub fn take_rows(&self, rows: &[usize]) -> Self {
        Self {
            index: self.index.take(rows),
            labels: self.labels.clone(),
            columns: self.columns.iter().map(|column| column.take(rows)).collect(),
        }
    }

    pub fn cast_columns(&self, dtypes: &[DType]) -> Result<Self, FrameError> {
        if dtypes.len() != self.columns.len() {
            return Err(FrameError::LengthMismatch {
                expected: self.columns.len(),
                found: dtypes.len(),
            });
        }

        let columns = self
            .columns
            .iter()
            .zip(dtypes)
            .map(|(column, dtype)| column.cast(*dtype))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(self.index.clone(), self.labels.clone(), columns)
    }

    pub fn cast_index(self, dtypes: &[DType]) -> Result<Self, FrameError> {
        let index = self.index.cast(dtypes)?;

        Ok(Self { index, ..self })
    }

    /// Move every index level into leading columns and install a range
    /// index. Levels whose name already labels a column are dropped.
    pub fn reset_index(self) -> Result<Self, FrameError> {
        let nlevels = self.column_nlevels();
        let rows = self.nrows();
        let mut frame = Self {
            index: Index::range(rows),
            labels: self.labels,
            columns: self.columns,
        };

        let mut inserted = 0;
        for level in 0..self.index.nlevels() {
            let name = self.index.level_name(level);
            let label = ColumnLabel::single(name).padded(nlevels);
            if frame.position(&label).is_some() {
                continue;
            }

            let values = self.index.level_values(level)?;
            let dtype = self.index.dtypes()[level];
            frame.insert_column(inserted, label, Column::typed(dtype, values))?;
            inserted += 1;
        }

        Ok(frame)
    }
}
