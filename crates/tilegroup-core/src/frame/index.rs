use crate::{
    frame::FrameError,
    value::{DType, KeyTuple, Value},
};

///
/// Index
///
/// Row labels: one key tuple per row, one named and typed level per tuple
/// position.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Index {
    names: Vec<Option<String>>,
    dtypes: Vec<DType>,
    keys: Vec<KeyTuple>,
}

impl Index {
    /// Single unnamed int64 level `0..rows`.
    #[must_use]
    pub fn range(rows: usize) -> Self {
        Self {
            names: vec![None],
            dtypes: vec![DType::Int64],
            keys: (0..rows).map(|row| vec![Value::Int(row as i64)]).collect(),
        }
    }

    pub fn new(
        names: Vec<Option<String>>,
        dtypes: Vec<DType>,
        keys: Vec<KeyTuple>,
    ) -> Result<Self, FrameError> {
        if dtypes.len() != names.len() {
            return Err(FrameError::LevelMismatch {
                expected: names.len(),
                found: dtypes.len(),
            });
        }
        if let Some(key) = keys.iter().find(|key| key.len() != names.len()) {
            return Err(FrameError::LevelMismatch {
                expected: names.len(),
                found: key.len(),
            });
        }

        Ok(Self {
            names,
            dtypes,
            keys,
        })
    }

    /// Build an index whose level dtypes are inferred from `keys`.
    pub fn from_keys(names: Vec<Option<String>>, keys: Vec<KeyTuple>) -> Result<Self, FrameError> {
        let dtypes = (0..names.len())
            .map(|level| DType::infer(keys.iter().filter_map(|key| key.get(level))))
            .collect();

        Self::new(names, dtypes, keys)
    }

    #[must_use]
    pub const fn nlevels(&self) -> usize {
        self.names.len()
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
    pub fn names(&self) -> &[Option<String>] {
        &self.names
    }

    #[must_use]
    pub fn dtypes(&self) -> &[DType] {
        &self.dtypes
    }

    #[must_use]
    pub fn keys(&self) -> &[KeyTuple] {
        &self.keys
    }

    /// Column name a level takes when moved into the data.
    #[must_use]
    pub fn level_name(&self, level: usize) -> String {
        match self.names.get(level) {
            Some(Some(name)) => name.clone(),
            _ if self.nlevels() == 1 => "index".to_string(),
            _ => format!("level_{level}"),
        }
    }

    pub fn level_values(&self, level: usize) -> Result<Vec<Value>, FrameError> {
        if level >= self.nlevels() {
            return Err(FrameError::IndexLevelNotFound {
                level,
                available: self.nlevels(),
            });
        }

        Ok(self.keys.iter().map(|key| key[level].clone()).collect())
    }

    #[must_use]
    pub fn take(&self, rows: &[usize]) -> Self {
        let keys = rows
            .iter()
            .filter_map(|&row| self.keys.get(row).cloned())
            .collect();

        Self {
            names: self.names.clone(),
            dtypes: self.dtypes.clone(),
            keys,
        }
    }

    /// Same keys with every level name cleared.
    #[must_use]
    pub fn strip_names(&self) -> Self {
        Self {
            names: vec![None; self.nlevels()],
            dtypes: self.dtypes.clone(),
            keys: self.keys.clone(),
        }
    }

    /// Same keys under new level names.
    pub fn with_names(&self, names: Vec<Option<String>>) -> Result<Self, FrameError> {
        if names.len() != self.nlevels() {
            return Err(FrameError::LevelMismatch {
                expected: self.nlevels(),
                found: names.len(),
            });
        }

        Ok(Self {
            names,
            dtypes: self.dtypes.clone(),
            keys: self.keys.clone(),
        })
    }

    pub fn cast(&self, dtypes: &[DType]) -> Result<Self, FrameError> {
        if dtypes.len() != self.nlevels() {
            return Err(FrameError::LevelMismatch {
                expected: self.nlevels(),
                found: dtypes.len(),
            });
        }

        let mut keys = Vec::with_capacity(self.keys.len());
        for key in &self.keys {
            let cast = key
                .iter()
                .zip(dtypes)
                .map(|(value, dtype)| {
                    value.cast(*dtype).ok_or(FrameError::UnsupportedDType {
                        dtype: value.dtype(),
                        operation: "index cast",
                    })
                })
                .collect::<Result<KeyTuple, _>>()?;
            keys.push(cast);
        }

        Ok(Self {
            names: self.names.clone(),
            dtypes: dtypes.to_vec(),
            keys,
        })
    }
}
