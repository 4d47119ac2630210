//! Module: exec::shuffle
//! Responsibility: regular-sampling partition of keyed partials and the
//! exchange that gathers one bucket per reducer.
//! Does not own: the graph topology (see `plan::shuffle`).
//! Boundary: operates on partial tuples produced by the map or combine stage.

use crate::{
    error::InternalError,
    exec::{ChunkData, PartialTuple, PivotSet, single_input},
    graph::{ChunkKey, PartitionMode, PivotOperand, SampleOperand, ShuffleMapOperand, ShuffleReduceOperand},
    runtime::ExecutionContext,
    value::{KeyTuple, stable_hash_key},
};

/// Draw `count` keys at regular positions of the sorted distinct local keys.
pub(super) fn sample(
    operand: SampleOperand,
    inputs: &[ChunkKey],
    ctx: &dyn ExecutionContext,
) -> Result<ChunkData, InternalError> {
    let data = ctx.fetch(single_input(inputs)?)?;
    let partials = data.as_partials()?;

    Ok(ChunkData::Samples(regular_sample(
        partials.group_keys(),
        operand.count,
    )))
}

pub(crate) fn regular_sample(keys: &[KeyTuple], count: usize) -> Vec<KeyTuple> {
    let mut distinct = keys.to_vec();
    distinct.sort();
    distinct.dedup();

    let len = distinct.len();
    if count == 0 || len <= count {
        return distinct;
    }

    (0..count).map(|i| distinct[i * len / count].clone()).collect()
}

/// Merge samples in chunk order and pick `partitions - 1` boundaries.
pub(super) fn pivot(
    operand: PivotOperand,
    inputs: &[ChunkKey],
    ctx: &dyn ExecutionContext,
) -> Result<ChunkData, InternalError> {
    let mut samples = Vec::new();
    for key in inputs {
        let data = ctx.fetch(key)?;
        samples.extend(data.as_samples()?.iter().cloned());
    }

    Ok(ChunkData::Pivots(choose_pivots(samples, operand.partitions)))
}

pub(crate) fn choose_pivots(mut samples: Vec<KeyTuple>, partitions: usize) -> PivotSet {
    let total = samples.len();
    if total == 0 || partitions < 2 {
        return PivotSet::default();
    }

    // Stable: equal keys keep the order of the chunks that sampled them.
    samples.sort();
    let pivots = (1..partitions)
        .map(|j| samples[(j * total / partitions).min(total - 1)].clone())
        .collect();

    PivotSet::new(pivots)
}

/// Split every partial of one chunk into `partitions` buckets.
pub(super) fn partition(
    operand: ShuffleMapOperand,
    inputs: &[ChunkKey],
    ctx: &dyn ExecutionContext,
) -> Result<ChunkData, InternalError> {
    let Some(source) = inputs.first() else {
        return Err(InternalError::executor_invariant(
            "shuffle map node has no input chunk",
        ));
    };
    let data = ctx.fetch(source)?;
    let partials = data.as_partials()?;

    let route: Box<dyn Fn(&KeyTuple) -> usize> = match operand.mode {
        PartitionMode::Pivot => {
            let key = inputs.get(1).ok_or_else(|| {
                InternalError::executor_invariant("pivot shuffle map has no pivot input")
            })?;
            let pivots = ctx.fetch(key)?.as_pivots()?.clone();
            Box::new(move |key| pivots.bucket_of(key))
        }
        PartitionMode::Hash => {
            let partitions = operand.partitions.max(1) as u64;
            Box::new(move |key| (stable_hash_key(key) % partitions) as usize)
        }
    };

    Ok(ChunkData::Buckets(split(
        partials,
        operand.partitions.max(1),
        route,
    )))
}

fn split(
    partials: &PartialTuple,
    partitions: usize,
    route: impl Fn(&KeyTuple) -> usize,
) -> Vec<PartialTuple> {
    let mut rows: Vec<Vec<usize>> = vec![Vec::new(); partitions];
    for (row, key) in partials.group_keys().iter().enumerate() {
        let bucket = route(key).min(partitions - 1);
        rows[bucket].push(row);
    }

    rows.iter().map(|rows| partials.take_rows(rows)).collect()
}

/// Gather bucket `operand.bucket` from every shuffle map behind the proxy.
pub(super) fn reduce(
    operand: ShuffleReduceOperand,
    inputs: &[ChunkKey],
    ctx: &dyn ExecutionContext,
) -> Result<ChunkData, InternalError> {
    let proxy = ctx.fetch(single_input(inputs)?)?;

    let mut held = Vec::new();
    for key in proxy.as_exchange()? {
        held.push(ctx.fetch(key)?);
    }

    let mut parts = Vec::with_capacity(held.len());
    for data in &held {
        let buckets = data.as_buckets()?;
        let bucket = buckets.get(operand.bucket).ok_or_else(|| {
            InternalError::executor_invariant(format!(
                "shuffle map produced {} buckets, reducer reads bucket {}",
                buckets.len(),
                operand.bucket,
            ))
        })?;
        parts.push(bucket);
    }

    Ok(ChunkData::Partials(PartialTuple::concat(&parts)?))
}
