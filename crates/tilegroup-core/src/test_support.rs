use crate::{
    exec::ChunkData,
    frame::{Column, ColumnLabel, Frame, Index},
    groupby::{ChunkRef, ColumnSchema, FuncSpec, GroupByParams, GroupByRequest, InputSchema, Tileable},
    runtime::{ExecutionContext, MemoryContext},
    value::{DType, Value},
};
use tilegroup_config::{AggregationConfig, TilingMethod};

/// `k: text, v: int64` rows split into the given chunks, stored in a fresh
/// context under keys `kv-<position>`.
pub(crate) fn kv_dataset(
    chunks: &[&[(&str, i64)]],
    params: GroupByParams,
    func: FuncSpec,
) -> (GroupByRequest, MemoryContext) {
    let ctx = MemoryContext::new();
    let mut refs = Vec::with_capacity(chunks.len());
    let mut offset = 0;

    for (position, rows) in chunks.iter().enumerate() {
        let key = format!("kv-{position}");
        ctx.set(key.as_str().into(), ChunkData::Frame(kv_frame(rows, offset)));
        refs.push(ChunkRef::new(key, position).with_rows(rows.len()));
        offset += rows.len();
    }

    let schema = InputSchema::new(vec![
        ColumnSchema::new("k", DType::Text),
        ColumnSchema::new("v", DType::Int64),
    ]);
    let request = GroupByRequest::new(Tileable::frame("kv", schema, refs), params, func);

    (request, ctx)
}

/// Rows as a frame whose range index starts at `offset`.
pub(crate) fn kv_frame(rows: &[(&str, i64)], offset: usize) -> Frame {
    let index = Index::new(
        vec![None],
        vec![DType::Int64],
        (0..rows.len())
            .map(|row| vec![Value::Int((offset + row) as i64)])
            .collect(),
    )
    .expect("range index");

    Frame::new(
        index,
        vec![ColumnLabel::single("k"), ColumnLabel::single("v")],
        vec![
            Column::typed(DType::Text, rows.iter().map(|(k, _)| Value::from(*k)).collect()),
            Column::typed(DType::Int64, rows.iter().map(|(_, v)| Value::Int(*v)).collect()),
        ],
    )
    .expect("kv frame")
}

pub(crate) fn config(method: TilingMethod, combine_size: usize) -> AggregationConfig {
    AggregationConfig::default()
        .with_method(method)
        .with_combine_size(combine_size)
        .expect("valid combine size")
}

/// `(key, value)` pairs of a one-key, one-column result.
pub(crate) fn pairs(frame: &Frame) -> Vec<(Value, Value)> {
    frame
        .index()
        .keys()
        .iter()
        .zip(frame.columns()[0].values())
        .map(|(key, value)| (key[0].clone(), value.clone()))
        .collect()
}
