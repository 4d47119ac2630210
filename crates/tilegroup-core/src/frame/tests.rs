use super::*;
use crate::value::Value;

fn frame_kv() -> Frame {
    Frame::from_columns([
        ("k", vec![Value::from("b"), Value::from("a"), Value::from("b"), Value::Null]),
        ("v", vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]),
    ])
    .expect("frame should build")
}

fn keyed(frame: &Frame, key: &str) -> (Frame, Vec<KeyColumn>) {
    let label = ColumnLabel::single(key);
    let column = frame.column(&label).expect("key column").clone();

    (
        frame.drop_columns(&[label]),
        vec![KeyColumn::new(Some(key.to_string()), column)],
    )
}

#[test]
fn groups_sorted_by_key_and_drop_null_keys() {
    let (data, keys) = keyed(&frame_kv(), "k");
    let grouped = GroupedFrame::new(data, &keys, true).expect("grouping should succeed");

    let groups = grouped.groups();
    assert_eq!(groups.keys(), &[vec![Value::from("a")], vec![Value::from("b")]]);
    assert_eq!(groups.rows(), &[vec![1], vec![0, 2]]);
}

#[test]
fn nan_keys_are_dropped_like_nulls() {
    let frame = Frame::from_columns([
        (
            "k",
            vec![Value::Float(1.0), Value::Float(f64::NAN), Value::Float(1.0), Value::Float(f64::NAN)],
        ),
        ("v", vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]),
    ])
    .expect("frame should build");
    let (data, keys) = keyed(&frame, "k");
    let grouped = GroupedFrame::new(data, &keys, true).expect("grouping should succeed");

    assert_eq!(grouped.groups().keys(), &[vec![Value::Float(1.0)]]);
    assert_eq!(grouped.groups().rows(), &[vec![0, 2]]);
}

#[test]
fn unsorted_groups_follow_first_appearance() {
    let (data, keys) = keyed(&frame_kv(), "k");
    let grouped = GroupedFrame::new(data, &keys, false).expect("grouping should succeed");

    assert_eq!(
        grouped.groups().keys(),
        &[vec![Value::from("b")], vec![Value::from("a")]],
    );
}

#[test]
fn concat_rows_requires_matching_labels() {
    let left = frame_kv();
    let right = Frame::from_columns([("other", vec![Value::Int(1)])]).expect("frame");

    let err = Frame::concat_rows(&[left, right]).expect_err("labels differ");
    assert!(matches!(err, FrameError::ColumnNotFound { .. }));
}

#[test]
fn concat_rows_empty_part_does_not_widen_dtype() {
    let full = Frame::from_columns([("v", vec![Value::Int(1)])]).expect("frame");
    let empty = Frame::new(
        Index::range(0),
        vec![ColumnLabel::single("v")],
        vec![Column::typed(DType::Object, Vec::new())],
    )
    .expect("empty frame");

    let stacked = Frame::concat_rows(&[empty, full]).expect("concat");
    assert_eq!(stacked.columns()[0].dtype(), DType::Int64);
    assert_eq!(stacked.nrows(), 1);
}

#[test]
fn concat_columns_aligns_on_index_keys() {
    let index_a = Index::from_keys(
        vec![Some("k".into())],
        vec![vec![Value::from("a")], vec![Value::from("b")]],
    )
    .expect("index");
    let index_b = Index::from_keys(
        vec![Some("k".into())],
        vec![vec![Value::from("b")], vec![Value::from("c")]],
    )
    .expect("index");
    let left = Frame::new(
        index_a,
        vec![ColumnLabel::single("x")],
        vec![Column::new(vec![Value::Int(1), Value::Int(2)])],
    )
    .expect("left");
    let right = Frame::new(
        index_b,
        vec![ColumnLabel::single("y")],
        vec![Column::new(vec![Value::Int(20), Value::Int(30)])],
    )
    .expect("right");

    let joined = Frame::concat_columns(&[left, right]).expect("concat");
    assert_eq!(joined.nrows(), 3);
    assert_eq!(
        joined.columns()[0].values(),
        &[Value::Int(1), Value::Int(2), Value::Null],
    );
    assert_eq!(
        joined.columns()[1].values(),
        &[Value::Null, Value::Int(20), Value::Int(30)],
    );
}

#[test]
fn select_duplicates_takes_successive_matches() {
    let frame = Frame::new(
        Index::range(1),
        vec![ColumnLabel::single("sum"), ColumnLabel::single("sum")],
        vec![Column::new(vec![Value::Int(1)]), Column::new(vec![Value::Int(2)])],
    )
    .expect("frame");

    let labels = vec![ColumnLabel::single("sum"), ColumnLabel::single("sum")];
    let picked = frame.select_duplicates(&labels).expect("both present");
    assert_eq!(picked.columns()[1].values(), &[Value::Int(2)]);

    // First-match lookup would silently repeat the first column.
    let naive = frame.select(&labels).expect("select");
    assert_eq!(naive.columns()[1].values(), &[Value::Int(1)]);
}

#[test]
fn reset_index_pads_labels_and_skips_existing_columns() {
    let index = Index::from_keys(
        vec![Some("k".into()), None],
        vec![vec![Value::from("a"), Value::Int(0)]],
    )
    .expect("index");
    let frame = Frame::new(
        index,
        vec![ColumnLabel::multi(["v", "sum"])],
        vec![Column::new(vec![Value::Int(5)])],
    )
    .expect("frame");

    let reset = frame.reset_index().expect("reset");
    assert_eq!(
        reset.labels(),
        &[
            ColumnLabel::multi(["k", ""]),
            ColumnLabel::multi(["level_1", ""]),
            ColumnLabel::multi(["v", "sum"]),
        ],
    );
    assert_eq!(reset.index().nlevels(), 1);

    let collide = Frame::new(
        Index::from_keys(vec![Some("v".into())], vec![vec![Value::Int(1)]]).expect("index"),
        vec![ColumnLabel::single("v")],
        vec![Column::new(vec![Value::Int(9)])],
    )
    .expect("frame");
    let reset = collide.reset_index().expect("reset");
    assert_eq!(reset.labels(), &[ColumnLabel::single("v")]);
}

#[test]
fn reindex_fills_missing_labels_with_nulls() {
    let frame = frame_kv();
    let reindexed = frame.reindex_columns(&[ColumnLabel::single("v"), ColumnLabel::single("zz")]);

    assert_eq!(reindexed.columns()[1].values(), vec![Value::Null; 4].as_slice());
}

#[test]
fn cast_index_of_empty_frame_sets_dtypes() {
    let index = Index::new(vec![Some("k".into())], vec![DType::Object], vec![]).expect("index");
    let empty = Frame::empty(index);

    let cast = empty.cast_index(&[DType::Text]).expect("cast");
    assert_eq!(cast.index().dtypes(), &[DType::Text]);
}

#[test]
fn estimated_size_counts_text_payload() {
    let frame = Frame::from_columns([("t", vec![Value::from("abcd")])]).expect("frame");

    // index int (8) + text header (24) + payload (4)
    assert_eq!(frame.estimated_size(), 36);
}
