//! Module: groupby::params
//! Responsibility: immutable logical grouping specification.
//! Does not own: function layout or physical staging.
//! Boundary: every derivation returns a new value; parents are never mutated.

use crate::{error::InternalError, graph::ChunkKey, value::DType};
use serde::{Deserialize, Serialize};

///
/// KeySource
///
/// Where an external key series lives: a whole tileable at planning time,
/// one chunk of it once bound to a map chunk.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    Tileable(String),
    Chunk(ChunkKey),
}

///
/// ByKey
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ByKey {
    Column(String),
    Series {
        name: String,
        dtype: DType,
        source: KeySource,
    },
}

impl ByKey {
    #[must_use]
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(name.into())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Column(name) | Self::Series { name, .. } => name,
        }
    }
}

///
/// Selection
///
/// Column projection applied after grouping. A single column makes the
/// grouped input one-dimensional.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    Column(String),
    Columns(Vec<String>),
}

impl Selection {
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        match self {
            Self::Column(name) => vec![name.clone()],
            Self::Columns(names) => names.clone(),
        }
    }
}

const fn default_true() -> bool {
    true
}

///
/// GroupByParams
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct GroupByParams {
    #[serde(default)]
    by: Vec<ByKey>,
    #[serde(default)]
    level: Option<Vec<usize>>,
    #[serde(default = "default_true")]
    as_index: bool,
    #[serde(default = "default_true")]
    sort: bool,
    #[serde(default)]
    selection: Option<Selection>,
}

impl GroupByParams {
    #[must_use]
    pub const fn new(by: Vec<ByKey>) -> Self {
        Self {
            by,
            level: None,
            as_index: true,
            sort: true,
            selection: None,
        }
    }

    #[must_use]
    pub fn by_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(columns.into_iter().map(ByKey::column).collect())
    }

    #[must_use]
    pub const fn by_levels(levels: Vec<usize>) -> Self {
        Self {
            by: Vec::new(),
            level: Some(levels),
            as_index: true,
            sort: true,
            selection: None,
        }
    }

    #[must_use]
    pub fn by(&self) -> &[ByKey] {
        &self.by
    }

    #[must_use]
    pub fn level(&self) -> Option<&[usize]> {
        self.level.as_deref()
    }

    #[must_use]
    pub const fn as_index(&self) -> bool {
        self.as_index
    }

    #[must_use]
    pub const fn sort(&self) -> bool {
        self.sort
    }

    #[must_use]
    pub const fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    #[must_use]
    pub fn with_as_index(&self, as_index: bool) -> Self {
        Self {
            as_index,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_sort(&self, sort: bool) -> Self {
        Self {
            sort,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_selection(&self, selection: Selection) -> Self {
        Self {
            selection: Some(selection),
            ..self.clone()
        }
    }

    /// Regroup by the first `index_levels` index levels of already-keyed
    /// partial results. Keys and selection no longer apply.
    #[must_use]
    pub fn with_levels(&self, index_levels: usize) -> Self {
        Self {
            by: Vec::new(),
            level: Some((0..index_levels).collect()),
            selection: None,
            ..self.clone()
        }
    }

    /// Replace tileable key sources with the chunk each resolves to.
    pub fn bind_series_chunks<F>(&self, mut resolve: F) -> Result<Self, InternalError>
    where
        F: FnMut(&str) -> Result<ChunkKey, InternalError>,
    {
        let mut by = Vec::with_capacity(self.by.len());
        for key in &self.by {
            let bound = match key {
                ByKey::Series {
                    name,
                    dtype,
                    source: KeySource::Tileable(id),
                } => ByKey::Series {
                    name: name.clone(),
                    dtype: *dtype,
                    source: KeySource::Chunk(resolve(id)?),
                },
                other => other.clone(),
            };
            by.push(bound);
        }

        Ok(Self {
            by,
            ..self.clone()
        })
    }

    /// Tileable ids of every unbound key series, in key order.
    pub fn series_sources(&self) -> impl Iterator<Item = &str> {
        self.by.iter().filter_map(|key| match key {
            ByKey::Series {
                source: KeySource::Tileable(id),
                ..
            } => Some(id.as_str()),
            _ => None,
        })
    }

    pub fn validate(&self) -> Result<(), InternalError> {
        match (&self.level, self.by.is_empty()) {
            (None, true) => Err(InternalError::planner_invalid(
                "groupby requires 'by' keys or index 'level'",
            )),
            (Some(_), false) => Err(InternalError::planner_invalid(
                "groupby accepts 'by' keys or index 'level', not both",
            )),
            (Some(levels), true) if levels.is_empty() => Err(InternalError::planner_invalid(
                "groupby 'level' must name at least one level",
            )),
            _ => Ok(()),
        }
    }
}
