//! Aggregation tiling configuration for tilegroup.
//!
//! Configuration is read from a `[groupby]` TOML table, validated once on
//! load, and handed to the planner as an immutable value. Heuristic
//! thresholds used by auto tiling live here rather than in planner code.

#[cfg(test)]
mod tests;

use serde::Deserialize;
use std::{fmt, fs, path::Path, str::FromStr};
use thiserror::Error as ThisError;

///
/// CONSTANTS
///

/// Default number of chunks merged by one tree-combine batch.
pub const DEFAULT_COMBINE_SIZE: usize = 4;

/// Default byte ceiling for one merged chunk (128 MiB).
pub const DEFAULT_CHUNK_STORE_LIMIT: u64 = 128 * 1024 * 1024;

/// Default fraction of `chunk_store_limit` an auto-selected tree may occupy.
pub const DEFAULT_TREE_BUDGET_RATIO: f64 = 0.25;

/// Default oversampling factor for sample-sort pivot selection.
pub const DEFAULT_SAMPLES_PER_PARTITION: usize = 1;

/// Default number of synthetic rows used by schema inference.
pub const DEFAULT_MOCK_SAMPLE_ROWS: usize = 3;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unsupported tiling method '{0}', expected 'auto', 'tree' or 'shuffle'")]
    UnsupportedMethod(String),

    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

///
/// TilingMethod
///
/// Requested physical strategy. `Auto` is always resolved to one of the
/// other two before a chunk graph is complete.
///

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum TilingMethod {
    #[default]
    Auto,
    Tree,
    Shuffle,
}

impl TilingMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Tree => "tree",
            Self::Shuffle => "shuffle",
        }
    }
}

impl fmt::Display for TilingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TilingMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "tree" => Ok(Self::Tree),
            "shuffle" => Ok(Self::Shuffle),
            other => Err(ConfigError::UnsupportedMethod(other.to_string())),
        }
    }
}

///
/// AggregationConfig
///
/// Validated tiling knobs for one grouped aggregation.
///

#[derive(Clone, Debug, PartialEq)]
pub struct AggregationConfig {
    method: TilingMethod,
    combine_size: usize,
    chunk_store_limit: u64,
    tree_budget_ratio: f64,
    samples_per_partition: usize,
    mock_sample_rows: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            method: TilingMethod::Auto,
            combine_size: DEFAULT_COMBINE_SIZE,
            chunk_store_limit: DEFAULT_CHUNK_STORE_LIMIT,
            tree_budget_ratio: DEFAULT_TREE_BUDGET_RATIO,
            samples_per_partition: DEFAULT_SAMPLES_PER_PARTITION,
            mock_sample_rows: DEFAULT_MOCK_SAMPLE_ROWS,
        }
    }
}

impl AggregationConfig {
    /// Parse and validate a config document containing a `[groupby]` table.
    /// A missing table yields the defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let document: ConfigDocument = toml::from_str(source)?;

        document.groupby.unwrap_or_default().into_config()
    }

    /// Read, parse and validate a config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&source)
    }

    #[must_use]
    pub const fn with_method(mut self, method: TilingMethod) -> Self {
        self.method = method;
        self
    }

    /// Override the tree fan-in. Values below 2 are rejected.
    pub fn with_combine_size(mut self, combine_size: usize) -> Result<Self, ConfigError> {
        self.combine_size = combine_size;
        self.validate()?;

        Ok(self)
    }

    /// Override the merged-chunk byte ceiling. Zero is rejected.
    pub fn with_chunk_store_limit(mut self, chunk_store_limit: u64) -> Result<Self, ConfigError> {
        self.chunk_store_limit = chunk_store_limit;
        self.validate()?;

        Ok(self)
    }

    #[must_use]
    pub const fn method(&self) -> TilingMethod {
        self.method
    }

    #[must_use]
    pub const fn combine_size(&self) -> usize {
        self.combine_size
    }

    #[must_use]
    pub const fn chunk_store_limit(&self) -> u64 {
        self.chunk_store_limit
    }

    #[must_use]
    pub const fn tree_budget_ratio(&self) -> f64 {
        self.tree_budget_ratio
    }

    #[must_use]
    pub const fn samples_per_partition(&self) -> usize {
        self.samples_per_partition
    }

    #[must_use]
    pub const fn mock_sample_rows(&self) -> usize {
        self.mock_sample_rows
    }

    /// Byte budget an auto-selected tree may reach before escalating.
    #[must_use]
    pub fn tree_budget_bytes(&self) -> f64 {
        self.chunk_store_limit as f64 * self.tree_budget_ratio
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.combine_size < 2 {
            return Err(ConfigError::InvalidValue {
                field: "combine_size",
                reason: format!("must be at least 2, got {}", self.combine_size),
            });
        }
        if self.chunk_store_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "chunk_store_limit",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !(self.tree_budget_ratio > 0.0 && self.tree_budget_ratio <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "tree_budget_ratio",
                reason: format!("must be in (0, 1], got {}", self.tree_budget_ratio),
            });
        }
        if self.samples_per_partition == 0 {
            return Err(ConfigError::InvalidValue {
                field: "samples_per_partition",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.mock_sample_rows == 0 {
            return Err(ConfigError::InvalidValue {
                field: "mock_sample_rows",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

///
/// ConfigDocument
///

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigDocument {
    groupby: Option<RawGroupByConfig>,
}

///
/// RawGroupByConfig
///
/// Unvalidated `[groupby]` table; every field falls back to its default.
///

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGroupByConfig {
    method: Option<String>,
    combine_size: Option<usize>,
    chunk_store_limit: Option<u64>,
    tree_budget_ratio: Option<f64>,
    samples_per_partition: Option<usize>,
    mock_sample_rows: Option<usize>,
}

impl RawGroupByConfig {
    fn into_config(self) -> Result<AggregationConfig, ConfigError> {
        let defaults = AggregationConfig::default();
        let method = match self.method {
            Some(method) => method.parse()?,
            None => defaults.method,
        };
        let config = AggregationConfig {
            method,
            combine_size: self.combine_size.unwrap_or(defaults.combine_size),
            chunk_store_limit: self.chunk_store_limit.unwrap_or(defaults.chunk_store_limit),
            tree_budget_ratio: self.tree_budget_ratio.unwrap_or(defaults.tree_budget_ratio),
            samples_per_partition: self
                .samples_per_partition
                .unwrap_or(defaults.samples_per_partition),
            mock_sample_rows: self.mock_sample_rows.unwrap_or(defaults.mock_sample_rows),
        };
        config.validate()?;

        Ok(config)
    }
}
