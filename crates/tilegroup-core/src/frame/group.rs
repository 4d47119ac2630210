//! Module: frame::group
//! Responsibility: row-to-group assignment for one frame.
//! Does not own: what is computed per group.
//! Boundary: grouping primitives shared by every stage.

use crate::{
    frame::{Column, Frame, FrameError, Index},
    value::{DType, KeyTuple, Value},
};
use std::{collections::HashMap, sync::Arc};

///
/// KeyColumn
///
/// One grouping level: an optional name and the per-row key values.
///

#[derive(Clone, Debug)]
pub struct KeyColumn {
    pub name: Option<String>,
    pub column: Column,
}

impl KeyColumn {
    #[must_use]
    pub const fn new(name: Option<String>, column: Column) -> Self {
        Self { name, column }
    }
}

///
/// Groups
///
/// Distinct key tuples and the source rows that map to each. With `sort`
/// the groups follow canonical key order, otherwise first appearance.
/// Rows with a null in any key level belong to no group.
///

#[derive(Clone, Debug)]
pub struct Groups {
    names: Vec<Option<String>>,
    dtypes: Vec<DType>,
    keys: Vec<KeyTuple>,
    rows: Vec<Vec<usize>>,
    source_rows: usize,
}

impl Groups {
    pub fn build(levels: &[KeyColumn], source_rows: usize, sort: bool) -> Result<Self, FrameError> {
        if let Some(level) = levels.iter().find(|level| level.column.len() != source_rows) {
            return Err(FrameError::LengthMismatch {
                expected: source_rows,
                found: level.column.len(),
            });
        }

        let mut slots: HashMap<KeyTuple, usize> = HashMap::new();
        let mut keys: Vec<KeyTuple> = Vec::new();
        let mut rows: Vec<Vec<usize>> = Vec::new();

        for row in 0..source_rows {
            let key: KeyTuple = levels
                .iter()
                .map(|level| level.column.values()[row].clone())
                .collect();
            if key.iter().any(Value::is_missing) {
                continue;
            }

            if let Some(&slot) = slots.get(&key) {
                rows[slot].push(row);
            } else {
                slots.insert(key.clone(), keys.len());
                keys.push(key);
                rows.push(vec![row]);
            }
        }

        if sort {
            let mut order: Vec<usize> = (0..keys.len()).collect();
            order.sort_by(|a, b| keys[*a].cmp(&keys[*b]));
            keys = order.iter().map(|&slot| keys[slot].clone()).collect();
            rows = order.iter().map(|&slot| std::mem::take(&mut rows[slot])).collect();
        }

        Ok(Self {
            names: levels.iter().map(|level| level.name.clone()).collect(),
            dtypes: levels.iter().map(|level| level.column.dtype()).collect(),
            keys,
            rows,
            source_rows,
        })
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[must_use]
    pub fn keys(&self) -> &[KeyTuple] {
        &self.keys
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<usize>] {
        &self.rows
    }

    #[must_use]
    pub fn names(&self) -> &[Option<String>] {
        &self.names
    }

    /// Output index with one row per group.
    pub fn key_index(&self) -> Result<Index, FrameError> {
        Index::new(self.names.clone(), self.dtypes.clone(), self.keys.clone())
    }
}

///
/// GroupedFrame
///
/// Value columns paired with a shared group assignment. Derived frames that
/// keep the row layout share the same `Groups`.
///

#[derive(Clone, Debug)]
pub struct GroupedFrame {
    data: Frame,
    groups: Arc<Groups>,
}

impl GroupedFrame {
    pub fn new(data: Frame, levels: &[KeyColumn], sort: bool) -> Result<Self, FrameError> {
        let groups = Groups::build(levels, data.nrows(), sort)?;

        Ok(Self {
            data,
            groups: Arc::new(groups),
        })
    }

    /// Group by existing index levels; every column stays a value column.
    pub fn from_index_levels(frame: Frame, levels: &[usize], sort: bool) -> Result<Self, FrameError> {
        let index = frame.index();
        let mut keys = Vec::with_capacity(levels.len());
        for &level in levels {
            let values = index.level_values(level)?;
            keys.push(KeyColumn::new(
                index.names()[level].clone(),
                Column::typed(index.dtypes()[level], values),
            ));
        }

        Self::new(frame, &keys, sort)
    }

    #[must_use]
    pub const fn data(&self) -> &Frame {
        &self.data
    }

    #[must_use]
    pub fn groups(&self) -> &Groups {
        &self.groups
    }

    /// Swap the value columns while keeping the group assignment.
    pub fn with_data(&self, data: Frame) -> Result<Self, FrameError> {
        if data.nrows() != self.groups.source_rows {
            return Err(FrameError::LengthMismatch {
                expected: self.groups.source_rows,
                found: data.nrows(),
            });
        }

        Ok(Self {
            data,
            groups: Arc::clone(&self.groups),
        })
    }
}
