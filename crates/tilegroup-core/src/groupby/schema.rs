use crate::{frame::ColumnLabel, graph::ChunkKey, value::DType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

///
/// DataKind
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Frame,
    Series,
}

///
/// ColumnSchema
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct ColumnSchema {
    pub name: String,
    pub dtype: DType,
}

impl ColumnSchema {
    #[must_use]
    pub fn new(name: impl Into<String>, dtype: DType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }
}

///
/// InputSchema
///
/// Declared columns and index of an input tileable. An empty index
/// declaration means a single unnamed int64 range level.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct InputSchema {
    pub columns: Vec<ColumnSchema>,
    #[serde(default)]
    pub index_names: Vec<Option<String>>,
    #[serde(default)]
    pub index_dtypes: Vec<DType>,
}

impl InputSchema {
    #[must_use]
    pub const fn new(columns: Vec<ColumnSchema>) -> Self {
        Self {
            columns,
            index_names: Vec::new(),
            index_dtypes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_index(mut self, names: Vec<Option<String>>, dtypes: Vec<DType>) -> Self {
        self.index_names = names;
        self.index_dtypes = dtypes;
        self
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    #[must_use]
    pub fn dtype_of(&self, name: &str) -> Option<DType> {
        self.columns
            .iter()
            .find(|column| column.name == name)
            .map(|column| column.dtype)
    }

    /// Effective index levels as `(names, dtypes)`.
    #[must_use]
    pub fn index_levels(&self) -> (Vec<Option<String>>, Vec<DType>) {
        if self.index_dtypes.is_empty() {
            return (vec![None], vec![DType::Int64]);
        }

        let mut names = self.index_names.clone();
        names.resize(self.index_dtypes.len(), None);

        (names, self.index_dtypes.clone())
    }
}

///
/// ChunkRef
///
/// One chunk of a tileable. `rows` is `None` while the row count is unknown.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct ChunkRef {
    pub key: ChunkKey,
    pub position: usize,
    #[serde(default)]
    pub rows: Option<usize>,
}

impl ChunkRef {
    #[must_use]
    pub fn new(key: impl Into<ChunkKey>, position: usize) -> Self {
        Self {
            key: key.into(),
            position,
            rows: None,
        }
    }

    #[must_use]
    pub const fn with_rows(mut self, rows: usize) -> Self {
        self.rows = Some(rows);
        self
    }
}

///
/// Tileable
///
/// Logical whole-table handle realized by an ordered list of chunks.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Tileable {
    pub id: String,
    pub kind: DataKind,
    pub schema: InputSchema,
    pub chunks: Vec<ChunkRef>,
}

impl Tileable {
    #[must_use]
    pub fn frame(id: impl Into<String>, schema: InputSchema, chunks: Vec<ChunkRef>) -> Self {
        Self {
            id: id.into(),
            kind: DataKind::Frame,
            schema,
            chunks,
        }
    }

    /// One-column series tileable named `name`.
    #[must_use]
    pub fn series(
        id: impl Into<String>,
        name: impl Into<String>,
        dtype: DType,
        chunks: Vec<ChunkRef>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: DataKind::Series,
            schema: InputSchema::new(vec![ColumnSchema::new(name, dtype)]),
            chunks,
        }
    }

    #[must_use]
    pub const fn ndim(&self) -> usize {
        match self.kind {
            DataKind::Frame => 2,
            DataKind::Series => 1,
        }
    }

    /// Chunks ordered by grid position.
    #[must_use]
    pub fn ordered_chunks(&self) -> Vec<&ChunkRef> {
        let mut chunks: Vec<&ChunkRef> = self.chunks.iter().collect();
        chunks.sort_by_key(|chunk| chunk.position);
        chunks
    }
}

///
/// OutputSchema
///
/// Declared shape of the final aggregation result as inferred by the mock
/// run: value column labels and dtypes, series name, and the index the
/// grouped result carries before any reset.
///

#[derive(Clone, Debug, PartialEq)]
pub struct OutputSchema {
    kind: DataKind,
    columns: Vec<ColumnLabel>,
    dtypes: Vec<DType>,
    name: Option<String>,
    index_names: Vec<Option<String>>,
    index_dtypes: Vec<DType>,
}

impl OutputSchema {
    #[must_use]
    pub const fn new(
        kind: DataKind,
        columns: Vec<ColumnLabel>,
        dtypes: Vec<DType>,
        name: Option<String>,
        index_names: Vec<Option<String>>,
        index_dtypes: Vec<DType>,
    ) -> Self {
        Self {
            kind,
            columns,
            dtypes,
            name,
            index_names,
            index_dtypes,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> DataKind {
        self.kind
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnLabel] {
        &self.columns
    }

    #[must_use]
    pub fn dtypes(&self) -> &[DType] {
        &self.dtypes
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn index_names(&self) -> &[Option<String>] {
        &self.index_names
    }

    #[must_use]
    pub fn index_dtypes(&self) -> &[DType] {
        &self.index_dtypes
    }

    #[must_use]
    pub fn column_levels(&self) -> usize {
        self.columns
            .iter()
            .map(ColumnLabel::nlevels)
            .max()
            .unwrap_or(1)
    }

    #[must_use]
    pub fn has_duplicate_columns(&self) -> bool {
        let distinct: BTreeSet<&ColumnLabel> = self.columns.iter().collect();
        distinct.len() != self.columns.len()
    }

    #[must_use]
    pub fn with_dtypes(mut self, dtypes: Vec<DType>, index_dtypes: Vec<DType>) -> Self {
        self.dtypes = dtypes;
        self.index_dtypes = index_dtypes;
        self
    }

    #[must_use]
    pub fn with_index_names(mut self, index_names: Vec<Option<String>>) -> Self {
        self.index_names = index_names;
        self
    }
}
