//! Deterministic chunk-key derivation from operation content and inputs.
#![allow(clippy::cast_possible_truncation)]

use crate::{
    frame::ColumnLabel,
    graph::{ChunkKey, ChunkOp, PartitionMode},
    groupby::{AggregationOperand, ByKey, GroupByParams, KeySource, Selection},
};
use std::fmt::Write as _;
use xxhash_rust::xxh3::Xxh3;

/// Derive the key of a planned chunk. The size recorder attached to probe
/// operands is deliberately not part of the content.
pub(super) fn chunk_key(op: &ChunkOp, inputs: &[ChunkKey], position: usize) -> ChunkKey {
    let mut hasher = Xxh3::new();
    hasher.update(b"chunkfp:v1");

    write_str(&mut hasher, op.stage_label());
    hash_op(&mut hasher, op);

    write_u32(&mut hasher, inputs.len() as u32);
    for input in inputs {
        write_str(&mut hasher, input.as_str());
    }
    write_u64(&mut hasher, position as u64);

    let digest = hasher.digest128();
    let mut out = String::with_capacity(32);
    let _ = write!(out, "{digest:032x}");

    ChunkKey(out)
}

fn hash_op(hasher: &mut Xxh3, op: &ChunkOp) {
    match op {
        ChunkOp::Source => write_tag(hasher, 0x01),
        ChunkOp::Aggregate(operand) => {
            write_tag(hasher, 0x02);
            hash_operand(hasher, operand);
        }
        ChunkOp::Concat => write_tag(hasher, 0x03),
        ChunkOp::Sample(sample) => {
            write_tag(hasher, 0x04);
            write_u64(hasher, sample.count as u64);
        }
        ChunkOp::Pivot(pivot) => {
            write_tag(hasher, 0x05);
            write_u64(hasher, pivot.partitions as u64);
        }
        ChunkOp::ShuffleMap(map) => {
            write_tag(hasher, 0x06);
            write_u64(hasher, map.partitions as u64);
            write_tag(
                hasher,
                match map.mode {
                    PartitionMode::Pivot => 0x10,
                    PartitionMode::Hash => 0x11,
                },
            );
        }
        ChunkOp::ShuffleProxy => write_tag(hasher, 0x07),
        ChunkOp::ShuffleReduce(reduce) => {
            write_tag(hasher, 0x08);
            write_u64(hasher, reduce.bucket as u64);
            write_u64(hasher, reduce.partitions as u64);
        }
    }
}

fn hash_operand(hasher: &mut Xxh3, operand: &AggregationOperand) {
    hash_params(hasher, operand.params());
    hash_params(hasher, operand.raw_params());

    let steps = operand.steps();
    write_u32(hasher, steps.agg().len() as u32);
    for step in steps.agg() {
        write_str(hasher, step.output_key.as_str());
    }
    write_u32(hasher, steps.post().len() as u32);
    for step in steps.post() {
        write_str(hasher, step.output_key.as_str());
        write_str(hasher, &step.finalize.to_string());
    }

    write_u64(hasher, operand.index_levels() as u64);
    write_u64(hasher, operand.combine_size() as u64);
    write_u64(hasher, operand.chunk_store_limit());
    write_bool(hasher, operand.reset_output_index());

    let schema = operand.schema();
    write_u32(hasher, schema.columns().len() as u32);
    for label in schema.columns() {
        write_label(hasher, label);
    }
    write_str(hasher, schema.name().unwrap_or(""));
}

fn hash_params(hasher: &mut Xxh3, params: &GroupByParams) {
    write_u32(hasher, params.by().len() as u32);
    for key in params.by() {
        match key {
            ByKey::Column(name) => {
                write_tag(hasher, 0x20);
                write_str(hasher, name);
            }
            ByKey::Series { name, source, .. } => {
                write_tag(hasher, 0x21);
                write_str(hasher, name);
                match source {
                    KeySource::Tileable(id) => {
                        write_tag(hasher, 0x22);
                        write_str(hasher, id);
                    }
                    KeySource::Chunk(key) => {
                        write_tag(hasher, 0x23);
                        write_str(hasher, key.as_str());
                    }
                }
            }
        }
    }

    match params.level() {
        Some(levels) => {
            write_tag(hasher, 0x30);
            write_u32(hasher, levels.len() as u32);
            for level in levels {
                write_u64(hasher, *level as u64);
            }
        }
        None => write_tag(hasher, 0x31),
    }

    write_bool(hasher, params.as_index());
    write_bool(hasher, params.sort());

    match params.selection() {
        None => write_tag(hasher, 0x40),
        Some(Selection::Column(name)) => {
            write_tag(hasher, 0x41);
            write_str(hasher, name);
        }
        Some(Selection::Columns(names)) => {
            write_tag(hasher, 0x42);
            write_u32(hasher, names.len() as u32);
            for name in names {
                write_str(hasher, name);
            }
        }
    }
}

fn write_label(hasher: &mut Xxh3, label: &ColumnLabel) {
    write_u32(hasher, label.nlevels() as u32);
    for level in label.levels() {
        write_str(hasher, level);
    }
}

fn write_tag(hasher: &mut Xxh3, tag: u8) {
    hasher.update(&[tag]);
}

fn write_bool(hasher: &mut Xxh3, value: bool) {
    hasher.update(&[u8::from(value)]);
}

fn write_u32(hasher: &mut Xxh3, value: u32) {
    hasher.update(&value.to_be_bytes());
}

fn write_u64(hasher: &mut Xxh3, value: u64) {
    hasher.update(&value.to_be_bytes());
}

fn write_str(hasher: &mut Xxh3, value: &str) {
    write_u32(hasher, value.len() as u32);
    hasher.update(value.as_bytes());
}
