mod support;

use proptest::prelude::*;
use support::{kv_request, rows_of};
use tilegroup_core::{
    AggregationConfig, TilingMethod,
    frame::Frame,
    groupby::{FuncSpec, GroupByParams},
    plan::GroupByPlanner,
    runtime::LocalRunner,
    value::Value,
};

fn arb_rows() -> impl Strategy<Value = Vec<(String, i64)>> {
    prop::collection::vec(("[a-h]", -50i64..50), 1..40)
}

fn arb_func() -> impl Strategy<Value = FuncSpec> {
    prop_oneof![
        Just(FuncSpec::Single("sum".into())),
        Just(FuncSpec::List(vec!["min".into(), "max".into(), "count".into()])),
        Just(FuncSpec::List(vec!["mean".into(), "var".into()])),
        Just(FuncSpec::List(vec!["size".into(), "sum".into()])),
    ]
}

/// Split `rows` into `parts` contiguous, non-empty chunks where possible.
fn split(rows: &[(String, i64)], parts: usize) -> Vec<Vec<(&str, i64)>> {
    let parts = parts.clamp(1, rows.len());
    let base = rows.len() / parts;
    let extra = rows.len() % parts;

    let mut chunks = Vec::with_capacity(parts);
    let mut start = 0;
    for part in 0..parts {
        let len = base + usize::from(part < extra);
        chunks.push(
            rows[start..start + len]
                .iter()
                .map(|(k, v)| (k.as_str(), *v))
                .collect(),
        );
        start += len;
    }

    chunks
}

fn aggregate(
    rows: &[(String, i64)],
    parts: usize,
    method: TilingMethod,
    combine_size: usize,
    func: &FuncSpec,
) -> Vec<Frame> {
    aggregate_with(
        GroupByParams::by_columns(["k"]),
        rows,
        parts,
        method,
        combine_size,
        func,
    )
}

fn aggregate_with(
    params: GroupByParams,
    rows: &[(String, i64)],
    parts: usize,
    method: TilingMethod,
    combine_size: usize,
    func: &FuncSpec,
) -> Vec<Frame> {
    let chunks = split(rows, parts);
    let borrowed: Vec<&[(&str, i64)]> = chunks.iter().map(Vec::as_slice).collect();
    let (request, ctx) = kv_request(&borrowed, params, func.clone());
    let config = AggregationConfig::default()
        .with_method(method)
        .with_combine_size(combine_size)
        .expect("config");

    LocalRunner::new(&ctx)
        .aggregate(&GroupByPlanner::new(config), &request)
        .expect("aggregate")
        .frames
}

fn arb_exact_func() -> impl Strategy<Value = FuncSpec> {
    prop_oneof![
        Just(FuncSpec::Single("sum".into())),
        Just(FuncSpec::Single("nunique".into())),
        Just(FuncSpec::List(vec!["ptp".into(), "count".into()])),
        Just(FuncSpec::List(vec!["min".into(), "nunique".into(), "max".into()])),
    ]
}

fn approx_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Float(a), Value::Float(b)) => {
            (a.is_nan() && b.is_nan()) || (a - b).abs() <= 1e-9 * a.abs().max(1.0)
        }
        _ => left == right,
    }
}

proptest! {
    #[test]
    fn tree_combine_matches_single_chunk(
        rows in arb_rows(),
        parts in 1usize..9,
        combine_size in 2usize..6,
        func in arb_func(),
    ) {
        let whole = aggregate(&rows, 1, TilingMethod::Tree, combine_size, &func);
        let tiled = aggregate(&rows, parts, TilingMethod::Tree, combine_size, &func);

        prop_assert_eq!(whole.len(), 1);
        prop_assert_eq!(tiled.len(), 1);
        prop_assert_eq!(whole[0].labels(), tiled[0].labels());

        let expected = rows_of(&whole[0]);
        let actual = rows_of(&tiled[0]);
        prop_assert_eq!(expected.len(), actual.len());
        for ((ek, ev), (ak, av)) in expected.iter().zip(&actual) {
            prop_assert_eq!(ek, ak);
            prop_assert!(
                ev.iter().zip(av).all(|(e, a)| approx_eq(e, a)),
                "{:?} != {:?}", ev, av
            );
        }
    }

    #[test]
    fn sorted_shuffle_partitions_keys_totally_and_in_order(
        rows in arb_rows(),
        parts in 1usize..9,
    ) {
        let func = FuncSpec::Single("sum".into());
        let reducers = aggregate(&rows, parts, TilingMethod::Shuffle, 2, &func);
        let whole = aggregate(&rows, 1, TilingMethod::Tree, 2, &func);

        let keys: Vec<Vec<Value>> = reducers
            .iter()
            .flat_map(|frame| frame.index().keys().to_vec())
            .collect();
        prop_assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));

        let combined = Frame::concat_rows(&reducers).expect("concat");
        prop_assert_eq!(rows_of(&combined), rows_of(&whole[0]));
    }

    #[test]
    fn unsorted_hash_shuffle_places_each_key_in_one_reducer(
        rows in arb_rows(),
        parts in 2usize..9,
        func in arb_exact_func(),
    ) {
        let params = GroupByParams::by_columns(["k"]).with_sort(false);
        let reducers = aggregate_with(params.clone(), &rows, parts, TilingMethod::Shuffle, 2, &func);
        let whole = aggregate_with(params, &rows, 1, TilingMethod::Tree, 2, &func);

        let mut keys: Vec<Vec<Value>> = reducers
            .iter()
            .flat_map(|frame| frame.index().keys().to_vec())
            .collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        prop_assert_eq!(keys.len(), total);

        let mut shuffled: Vec<_> = reducers.iter().flat_map(rows_of).collect();
        let mut expected = rows_of(&whole[0]);
        shuffled.sort();
        expected.sort();
        prop_assert_eq!(shuffled, expected);
    }
}
