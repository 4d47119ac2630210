//! Module: value
//! Responsibility: scalar cell values, dtypes, canonical ordering and hashing.
//! Does not own: column storage or grouping.
//! Boundary: every key comparison and partition hash goes through here.

mod compare;
mod hash;

#[cfg(test)]
mod tests;

pub use compare::canonical_cmp;
pub use hash::{StableHash, stable_hash_key, stable_hash_value};

use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
};

///
/// KeyTuple
///
/// One group key: a value per grouping level.
///

pub type KeyTuple = Vec<Value>;

///
/// Value
///
/// Null  → missing cell; skipped by reductions and dropped from group keys.
/// List  → collection payload used by partial states such as distinct sets.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Self>),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Null or a NaN float; grouping and reductions skip both.
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_) | Self::Bool(_))
    }

    /// Numeric view used by float-valued reductions.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Bool(v) => Some(f64::from(u8::from(*v))),
            _ => None,
        }
    }

    /// Truthiness used by `any` / `all`.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(v) => *v,
            Self::Int(v) => *v != 0,
            Self::Float(v) => *v != 0.0,
            Self::Text(v) => !v.is_empty(),
            Self::List(v) => !v.is_empty(),
        }
    }

    /// Dtype this single value would imply for a column.
    #[must_use]
    pub const fn dtype(&self) -> DType {
        match self {
            Self::Null => DType::Object,
            Self::Bool(_) => DType::Bool,
            Self::Int(_) => DType::Int64,
            Self::Float(_) => DType::Float64,
            Self::Text(_) => DType::Text,
            Self::List(_) => DType::List,
        }
    }

    /// Convert this value into `dtype`, returning `None` when the value has
    /// no representation there.
    #[must_use]
    pub fn cast(&self, dtype: DType) -> Option<Self> {
        match (self, dtype) {
            (Self::Null, _) | (_, DType::Object) => Some(self.clone()),
            (Self::Bool(v), DType::Bool) => Some(Self::Bool(*v)),
            (Self::Bool(v), DType::Int64) => Some(Self::Int(i64::from(*v))),
            (Self::Int(v), DType::Int64) => Some(Self::Int(*v)),
            (Self::Int(v), DType::Bool) => Some(Self::Bool(*v != 0)),
            (Self::Float(v), DType::Int64) if v.fract() == 0.0 => Some(Self::Int(*v as i64)),
            (value, DType::Float64) => value.as_f64().map(Self::Float),
            (Self::Text(v), DType::Text) => Some(Self::Text(v.clone())),
            (Self::List(v), DType::List) => Some(Self::List(v.clone())),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        canonical_cmp(self, other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        canonical_cmp(self, other)
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(stable_hash_value(self));
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

///
/// DType
///
/// Column element type. `Object` is what inference yields over zero values.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DType {
    Bool,
    Int64,
    Float64,
    Text,
    List,
    Object,
}

impl DType {
    /// Infer a column dtype from its values. Int and Float mix to Float;
    /// any other mix, or no non-null value at all, is Object.
    #[must_use]
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut inferred: Option<Self> = None;
        for value in values {
            if value.is_null() {
                continue;
            }
            let dtype = value.dtype();
            inferred = Some(match inferred {
                None => dtype,
                Some(current) if current == dtype => current,
                Some(Self::Int64 | Self::Float64)
                    if matches!(dtype, Self::Int64 | Self::Float64) =>
                {
                    Self::Float64
                }
                Some(_) => return Self::Object,
            });
        }

        inferred.unwrap_or(Self::Object)
    }

    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Bool | Self::Int64 | Self::Float64)
    }

    /// Fixed per-cell byte estimate used by size recording.
    #[must_use]
    pub const fn cell_bytes(self) -> u64 {
        match self {
            Self::Bool => 1,
            Self::Int64 | Self::Float64 => 8,
            Self::Text | Self::List | Self::Object => 24,
        }
    }

    /// Representative value used by schema inference samples.
    #[must_use]
    pub fn sample_value(self, row: usize) -> Value {
        let ordinal = row as i64 + 1;
        match self {
            Self::Bool => Value::Bool(row % 2 == 0),
            Self::Int64 => Value::Int(ordinal),
            Self::Float64 => Value::Float(ordinal as f64),
            Self::Text => Value::Text(char::from(b'a' + (row % 26) as u8).to_string()),
            Self::List => Value::List(vec![Value::Int(ordinal)]),
            Self::Object => Value::Null,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Bool => "bool",
            Self::Int64 => "int64",
            Self::Float64 => "float64",
            Self::Text => "text",
            Self::List => "list",
            Self::Object => "object",
        };
        write!(f, "{label}")
    }
}
