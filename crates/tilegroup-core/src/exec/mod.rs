//! Module: exec
//! Responsibility: per-node execution semantics of every chunk operation.
//! Does not own: graph construction, scheduling, or chunk storage.
//! Boundary: each node is a pure function of its inputs as read from the
//! execution context.

mod agg;
mod combine;
mod map;
mod reconcile;
mod shuffle;


pub(crate) use agg::aggregate_partials;
pub(crate) use map::{group_input, map_partials};

use crate::{
    error::InternalError,
    frame::Frame,
    graph::{ChunkKey, ChunkNode, ChunkOp},
    groupby::Stage,
    runtime::ExecutionContext,
    value::{KeyTuple, Value},
};
use derive_more::{Deref, IntoIterator};
use log::trace;

///
/// PartialTuple
///
/// Partial frames of one chunk in agg-step order; each step contributes
/// `output_count` consecutive frames keyed by the group index.
///

#[derive(Clone, Debug, Default, Deref, IntoIterator, PartialEq)]
#[into_iterator(owned, ref)]
pub struct PartialTuple(Vec<Frame>);

impl PartialTuple {
    #[must_use]
    pub const fn new(frames: Vec<Frame>) -> Self {
        Self(frames)
    }

    #[must_use]
    pub fn into_frames(self) -> Vec<Frame> {
        self.0
    }

    #[must_use]
    pub fn estimated_size(&self) -> u64 {
        self.0.iter().map(Frame::estimated_size).sum()
    }

    /// Distinct group keys of this tuple, taken from its first partial.
    #[must_use]
    pub fn group_keys(&self) -> &[KeyTuple] {
        self.0
            .first()
            .map(|frame| frame.index().keys())
            .unwrap_or_default()
    }

    /// Stack tuples element-wise.
    pub fn concat(parts: &[&Self]) -> Result<Self, InternalError> {
        let Some(first) = parts.first() else {
            return Ok(Self::default());
        };
        if let Some(other) = parts.iter().find(|part| part.len() != first.len()) {
            return Err(InternalError::executor_invariant(format!(
                "cannot concatenate partial tuples of width {} and {}",
                first.len(),
                other.len(),
            )));
        }

        let mut frames = Vec::with_capacity(first.len());
        for slot in 0..first.len() {
            let column: Vec<Frame> = parts.iter().map(|part| part.0[slot].clone()).collect();
            frames.push(Frame::concat_rows(&column)?);
        }

        Ok(Self(frames))
    }

    /// Same tuple restricted to `rows` of every partial.
    #[must_use]
    pub fn take_rows(&self, rows: &[usize]) -> Self {
        Self(self.0.iter().map(|frame| frame.take_rows(rows)).collect())
    }
}

///
/// PivotSet
///
/// Ordered partition boundaries; `p - 1` entries for `p` partitions.
///

#[derive(Clone, Debug, Default, Deref, Eq, IntoIterator, PartialEq)]
#[into_iterator(owned, ref)]
pub struct PivotSet(Vec<KeyTuple>);

impl PivotSet {
    #[must_use]
    pub const fn new(pivots: Vec<KeyTuple>) -> Self {
        Self(pivots)
    }

    /// Partition a key falls into: the number of pivots strictly below it.
    #[must_use]
    pub fn bucket_of(&self, key: &[Value]) -> usize {
        self.0.partition_point(|pivot| pivot.as_slice() < key)
    }
}

///
/// ChunkData
///
/// Materialized output of one chunk.
///

#[derive(Clone, Debug, PartialEq)]
pub enum ChunkData {
    Frame(Frame),
    Partials(PartialTuple),
    Samples(Vec<KeyTuple>),
    Pivots(PivotSet),
    Buckets(Vec<PartialTuple>),
    Exchange(Vec<ChunkKey>),
}

impl ChunkData {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Frame(_) => "frame",
            Self::Partials(_) => "partials",
            Self::Samples(_) => "samples",
            Self::Pivots(_) => "pivots",
            Self::Buckets(_) => "buckets",
            Self::Exchange(_) => "exchange",
        }
    }

    pub fn as_frame(&self) -> Result<&Frame, InternalError> {
        match self {
            Self::Frame(frame) => Ok(frame),
            other => Err(mismatch("frame", other)),
        }
    }

    pub fn as_partials(&self) -> Result<&PartialTuple, InternalError> {
        match self {
            Self::Partials(partials) => Ok(partials),
            other => Err(mismatch("partials", other)),
        }
    }

    pub fn as_samples(&self) -> Result<&[KeyTuple], InternalError> {
        match self {
            Self::Samples(samples) => Ok(samples),
            other => Err(mismatch("samples", other)),
        }
    }

    pub fn as_pivots(&self) -> Result<&PivotSet, InternalError> {
        match self {
            Self::Pivots(pivots) => Ok(pivots),
            other => Err(mismatch("pivots", other)),
        }
    }

    pub fn as_buckets(&self) -> Result<&[PartialTuple], InternalError> {
        match self {
            Self::Buckets(buckets) => Ok(buckets),
            other => Err(mismatch("buckets", other)),
        }
    }

    pub fn as_exchange(&self) -> Result<&[ChunkKey], InternalError> {
        match self {
            Self::Exchange(keys) => Ok(keys),
            other => Err(mismatch("exchange", other)),
        }
    }
}

impl From<Frame> for ChunkData {
    fn from(frame: Frame) -> Self {
        Self::Frame(frame)
    }
}

fn mismatch(expected: &str, found: &ChunkData) -> InternalError {
    InternalError::executor_invariant(format!(
        "expected {expected} chunk data, found {}",
        found.kind(),
    ))
}

/// Compute the output of `node` from its inputs in `ctx`.
pub fn execute_node(
    node: &ChunkNode,
    ctx: &dyn ExecutionContext,
) -> Result<ChunkData, InternalError> {
    trace!("execute {} node {}", node.stage_label(), node.key());

    let inputs = node.inputs();
    match node.op() {
        ChunkOp::Source => Err(InternalError::chunk_not_found(node.key())),
        ChunkOp::Aggregate(operand) => match operand.stage() {
            Some(Stage::Map) => map::execute(operand, inputs, ctx),
            Some(Stage::Combine) => combine::execute(operand, inputs, ctx),
            Some(Stage::Agg) => agg::execute(operand, inputs, ctx),
            Some(Stage::Reduce) | None => Err(InternalError::executor_invariant(format!(
                "aggregate node {} has no executable stage",
                node.key(),
            ))),
        },
        ChunkOp::Concat => concat(inputs, ctx),
        ChunkOp::Sample(sample) => shuffle::sample(*sample, inputs, ctx),
        ChunkOp::Pivot(pivot) => shuffle::pivot(*pivot, inputs, ctx),
        ChunkOp::ShuffleMap(partition) => shuffle::partition(*partition, inputs, ctx),
        ChunkOp::ShuffleProxy => Ok(ChunkData::Exchange(inputs.to_vec())),
        ChunkOp::ShuffleReduce(reduce) => shuffle::reduce(*reduce, inputs, ctx),
    }
}

// Row-wise concatenation of partial tuples or of plain frames.
fn concat(inputs: &[ChunkKey], ctx: &dyn ExecutionContext) -> Result<ChunkData, InternalError> {
    let data = inputs
        .iter()
        .map(|key| ctx.fetch(key))
        .collect::<Result<Vec<_>, _>>()?;

    match data.first().map(|first| &**first) {
        Some(ChunkData::Frame(_)) => {
            let frames = data
                .iter()
                .map(|item| item.as_frame().cloned())
                .collect::<Result<Vec<_>, _>>()?;

            Ok(ChunkData::Frame(Frame::concat_rows(&frames)?))
        }
        _ => {
            let parts = data
                .iter()
                .map(|item| item.as_partials())
                .collect::<Result<Vec<_>, _>>()?;

            Ok(ChunkData::Partials(PartialTuple::concat(&parts)?))
        }
    }
}

// Exactly one upstream chunk.
fn single_input(inputs: &[ChunkKey]) -> Result<&ChunkKey, InternalError> {
    match inputs {
        [key] => Ok(key),
        other => Err(InternalError::executor_invariant(format!(
            "expected one input chunk, found {}",
            other.len(),
        ))),
    }
}
