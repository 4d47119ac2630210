#![allow(dead_code)]

use tilegroup_core::{
    exec::ChunkData,
    frame::{Column, ColumnLabel, Frame, Index},
    groupby::{ChunkRef, ColumnSchema, FuncSpec, GroupByParams, GroupByRequest, InputSchema, Tileable},
    runtime::{ExecutionContext, MemoryContext},
    value::{DType, Value},
};

pub type Rows<'a> = &'a [(&'a str, i64)];

/// Store `frames` as the chunks of tileable `id` and describe them.
pub fn load(ctx: &MemoryContext, id: &str, schema: InputSchema, frames: Vec<Frame>) -> Tileable {
    let chunks = frames
        .into_iter()
        .enumerate()
        .map(|(position, frame)| {
            let key = format!("{id}-{position}");
            let chunk = ChunkRef::new(key.as_str(), position).with_rows(frame.nrows());
            ctx.set(key.into(), ChunkData::Frame(frame));
            chunk
        })
        .collect();

    Tileable::frame(id, schema, chunks)
}

pub fn kv_schema() -> InputSchema {
    InputSchema::new(vec![
        ColumnSchema::new("k", DType::Text),
        ColumnSchema::new("v", DType::Int64),
    ])
}

/// Frame with the given columns over a range index starting at `offset`.
pub fn frame(offset: usize, columns: Vec<(&str, DType, Vec<Value>)>) -> Frame {
    let rows = columns.first().map_or(0, |(_, _, values)| values.len());
    let index = Index::new(
        vec![None],
        vec![DType::Int64],
        (offset..offset + rows).map(|row| vec![Value::Int(row as i64)]).collect(),
    )
    .expect("range index");
    let (labels, columns) = columns
        .into_iter()
        .map(|(name, dtype, values)| (ColumnLabel::single(name), Column::typed(dtype, values)))
        .unzip();

    Frame::new(index, labels, columns).expect("frame")
}

pub fn kv_frame(offset: usize, rows: Rows<'_>) -> Frame {
    frame(
        offset,
        vec![
            ("k", DType::Text, rows.iter().map(|(k, _)| Value::from(*k)).collect()),
            ("v", DType::Int64, rows.iter().map(|(_, v)| Value::Int(*v)).collect()),
        ],
    )
}

/// `k`/`v` chunks stored in a fresh context, grouped by `k`.
pub fn kv_request(
    chunks: &[Rows<'_>],
    params: GroupByParams,
    func: FuncSpec,
) -> (GroupByRequest, MemoryContext) {
    let ctx = MemoryContext::new();
    let mut offset = 0;
    let frames = chunks
        .iter()
        .map(|rows| {
            let frame = kv_frame(offset, rows);
            offset += rows.len();
            frame
        })
        .collect();
    let input = load(&ctx, "kv", kv_schema(), frames);

    (GroupByRequest::new(input, params, func), ctx)
}

/// Index keys and row values of a result, in row order.
pub fn rows_of(frame: &Frame) -> Vec<(Vec<Value>, Vec<Value>)> {
    (0..frame.nrows())
        .map(|row| {
            let key = frame.index().keys()[row].clone();
            let values = frame
                .columns()
                .iter()
                .map(|column| column.values()[row].clone())
                .collect();
            (key, values)
        })
        .collect()
}
