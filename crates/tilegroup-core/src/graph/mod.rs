//! Module: graph
//! Responsibility: immutable chunk-level operation graph and its node types.
//! Does not own: strategy selection or node semantics.
//! Boundary: the in-memory description handed to a scheduler.

mod builder;
mod fingerprint;

#[cfg(test)]
mod tests;

pub use builder::GraphBuilder;

use crate::groupby::{AggregationOperand, OutputSchema, Stage};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, sync::Arc};

///
/// ChunkKey
///
/// Content-addressed chunk identity. Source chunks carry caller-chosen keys;
/// planned chunks carry a hex digest of their operation and inputs.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ChunkKey(String);

impl ChunkKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChunkKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ChunkKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

///
/// ChunkShape
///
/// `None` in a dimension means unknown until execution.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ChunkShape {
    pub rows: Option<usize>,
    pub cols: Option<usize>,
}

///
/// ChunkMeta
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChunkMeta {
    pub position: usize,
    pub shape: ChunkShape,
    pub schema: Option<Arc<OutputSchema>>,
}

impl ChunkMeta {
    #[must_use]
    pub fn at(position: usize) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_rows(mut self, rows: Option<usize>) -> Self {
        self.shape.rows = rows;
        self
    }

    #[must_use]
    pub fn with_schema(mut self, schema: Arc<OutputSchema>) -> Self {
        self.shape.cols = Some(schema.columns().len());
        self.schema = Some(schema);
        self
    }
}

///
/// SampleOperand
///
/// Draw `count` keys at regular positions of the chunk's sorted distinct keys.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SampleOperand {
    pub count: usize,
}

///
/// PivotOperand
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct PivotOperand {
    pub partitions: usize,
}

///
/// PartitionMode
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PartitionMode {
    /// Route by the number of pivots strictly below the key.
    Pivot,
    /// Route by `stable_hash(key) % partitions`.
    Hash,
}

///
/// ShuffleMapOperand
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ShuffleMapOperand {
    pub partitions: usize,
    pub mode: PartitionMode,
}

///
/// ShuffleReduceOperand
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ShuffleReduceOperand {
    pub bucket: usize,
    pub partitions: usize,
}

///
/// ChunkOp
///

#[derive(Clone, Debug)]
pub enum ChunkOp {
    Source,
    Aggregate(AggregationOperand),
    Concat,
    Sample(SampleOperand),
    Pivot(PivotOperand),
    ShuffleMap(ShuffleMapOperand),
    ShuffleProxy,
    ShuffleReduce(ShuffleReduceOperand),
}

impl ChunkOp {
    /// Stage label used for inspection and logging.
    #[must_use]
    pub fn stage_label(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Aggregate(op) => op.stage().map_or("aggregate", |stage| stage.label()),
            Self::Concat => "concat",
            Self::Sample(_) => "sample",
            Self::Pivot(_) => "pivot",
            Self::ShuffleMap(_) => "shuffle_map",
            Self::ShuffleProxy => "proxy",
            Self::ShuffleReduce(_) => Stage::Reduce.label(),
        }
    }
}

///
/// ChunkNode
///

#[derive(Clone, Debug)]
pub struct ChunkNode {
    key: ChunkKey,
    op: ChunkOp,
    inputs: Vec<ChunkKey>,
    meta: ChunkMeta,
}

impl ChunkNode {
    #[must_use]
    pub const fn key(&self) -> &ChunkKey {
        &self.key
    }

    #[must_use]
    pub const fn op(&self) -> &ChunkOp {
        &self.op
    }

    #[must_use]
    pub fn inputs(&self) -> &[ChunkKey] {
        &self.inputs
    }

    #[must_use]
    pub const fn meta(&self) -> &ChunkMeta {
        &self.meta
    }

    #[must_use]
    pub fn stage_label(&self) -> &'static str {
        self.op.stage_label()
    }

    /// Whether executing this node reports to a size recorder. Such nodes
    /// share their key with the plain map node and must run even when that
    /// chunk is already stored.
    #[must_use]
    pub const fn records_sizes(&self) -> bool {
        matches!(&self.op, ChunkOp::Aggregate(operand) if operand.size_recorder().is_some())
    }
}

///
/// ChunkGraph
///
/// Nodes in topological order plus the ordered result keys.
///

#[derive(Clone, Debug, Default)]
pub struct ChunkGraph {
    nodes: Vec<ChunkNode>,
    positions: HashMap<ChunkKey, usize>,
    results: Vec<ChunkKey>,
}

impl ChunkGraph {
    #[must_use]
    pub fn node(&self, key: &ChunkKey) -> Option<&ChunkNode> {
        self.positions.get(key).map(|&pos| &self.nodes[pos])
    }

    #[must_use]
    pub fn nodes(&self) -> &[ChunkNode] {
        &self.nodes
    }

    #[must_use]
    pub fn results(&self) -> &[ChunkKey] {
        &self.results
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Stage label of every node, in graph order.
    #[must_use]
    pub fn stage_sequence(&self) -> Vec<&'static str> {
        self.nodes.iter().map(ChunkNode::stage_label).collect()
    }

    #[must_use]
    pub fn count_stage(&self, label: &str) -> usize {
        self.nodes_in_stage(label).count()
    }

    pub fn nodes_in_stage<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a ChunkNode> {
        self.nodes
            .iter()
            .filter(move |node| node.stage_label() == label)
    }
}
