use super::*;
use crate::{
    error::ErrorClass,
    frame::ColumnLabel,
    reduce::{DefaultReductionCompiler, ReductionCompiler},
    value::DType,
};
use std::sync::Arc;
use tilegroup_config::AggregationConfig;

fn schema() -> InputSchema {
    InputSchema::new(vec![
        ColumnSchema::new("k", DType::Text),
        ColumnSchema::new("v", DType::Int64),
        ColumnSchema::new("w", DType::Float64),
    ])
}

fn request(params: GroupByParams, func: FuncSpec) -> GroupByRequest {
    let chunks = vec![ChunkRef::new("in-0", 0)];

    GroupByRequest::new(Tileable::frame("in", schema(), chunks), params, func)
}

fn operand(params: GroupByParams) -> AggregationOperand {
    let req = request(params.clone(), FuncSpec::Single("sum".into()));
    let grouped = req.grouped_input().expect("grouped input");
    let funcs = req.func.requested(&grouped, req.kwargs).expect("funcs");
    let steps = DefaultReductionCompiler::default()
        .compile(&funcs, grouped.ndim)
        .expect("steps");
    let layout = req.func.layout(&grouped).expect("layout");
    let schema = OutputSchema::new(
        layout.kind,
        layout.columns,
        vec![DType::Int64, DType::Float64],
        layout.name,
        vec![Some("k".into())],
        vec![DType::Text],
    );

    AggregationOperand::new(
        OperandParts {
            raw_params: params.clone(),
            params,
            steps: Arc::new(steps),
            schema: Arc::new(schema),
            index_levels: 1,
            reset_output_index: false,
        },
        &AggregationConfig::default(),
    )
}

#[test]
fn params_need_exactly_one_of_by_and_level() {
    assert!(GroupByParams::by_columns(["k"]).validate().is_ok());
    assert!(GroupByParams::by_levels(vec![0]).validate().is_ok());

    let none = GroupByParams::new(Vec::new())
        .validate()
        .expect_err("empty grouping");
    assert_eq!(none.class, ErrorClass::InvalidInput);

    let empty_levels = GroupByParams::by_levels(Vec::new())
        .validate()
        .expect_err("empty level list");
    assert_eq!(empty_levels.class, ErrorClass::InvalidInput);
}

#[test]
fn derived_params_leave_the_parent_untouched() {
    let parent = GroupByParams::by_columns(["k"]).with_selection(Selection::Column("v".into()));
    let regrouped = parent.with_levels(2);

    assert_eq!(parent.by().len(), 1);
    assert!(parent.selection().is_some());
    assert!(regrouped.by().is_empty());
    assert_eq!(regrouped.level(), Some(&[0, 1][..]));
    assert!(regrouped.selection().is_none());
    assert_eq!(regrouped.sort(), parent.sort());
}

#[test]
fn series_keys_bind_to_chunks() {
    let params = GroupByParams::new(vec![
        ByKey::column("k"),
        ByKey::Series {
            name: "s".into(),
            dtype: DType::Int64,
            source: KeySource::Tileable("series".into()),
        },
    ]);
    assert_eq!(params.series_sources().collect::<Vec<_>>(), vec!["series"]);

    let bound = params
        .bind_series_chunks(|id| Ok(format!("{id}-3").into()))
        .expect("binding");

    assert_eq!(bound.series_sources().count(), 0);
    assert!(matches!(
        &bound.by()[1],
        ByKey::Series { source: KeySource::Chunk(chunk), .. } if chunk.as_str() == "series-3"
    ));
}

#[test]
fn grouped_input_drops_keys_and_applies_selection() {
    let all = request(GroupByParams::by_columns(["k"]), FuncSpec::Single("sum".into()))
        .grouped_input()
        .expect("grouped input");
    assert_eq!(all.columns, vec!["v", "w"]);
    assert_eq!(all.ndim, 2);

    let params = GroupByParams::by_columns(["k"]).with_selection(Selection::Column("w".into()));
    let one = request(params, FuncSpec::Single("sum".into()))
        .grouped_input()
        .expect("selected input");
    assert_eq!(one.columns, vec!["w"]);
    assert_eq!(one.ndim, 1);
}

#[test]
fn grouped_input_rejects_unknown_key() {
    let err = request(GroupByParams::by_columns(["missing"]), FuncSpec::Single("sum".into()))
        .grouped_input()
        .expect_err("unknown key column");

    assert_eq!(err.class, ErrorClass::NotFound);
}

#[test]
fn list_layout_nests_function_under_column() {
    let input = GroupedInput {
        columns: vec!["v".into(), "w".into()],
        ndim: 2,
    };
    let layout = FuncSpec::List(vec!["sum".into(), "mean".into()])
        .layout(&input)
        .expect("layout");

    assert_eq!(layout.kind, DataKind::Frame);
    assert_eq!(
        layout.columns,
        vec![
            ColumnLabel::multi(["v", "sum"]),
            ColumnLabel::multi(["v", "mean"]),
            ColumnLabel::multi(["w", "sum"]),
            ColumnLabel::multi(["w", "mean"]),
        ]
    );
}

#[test]
fn single_function_on_series_input_is_a_series() {
    let input = GroupedInput {
        columns: vec!["v".into()],
        ndim: 1,
    };
    let layout = FuncSpec::Single("max".into()).layout(&input).expect("layout");

    assert_eq!(layout.kind, DataKind::Series);
    assert_eq!(layout.name.as_deref(), Some("v"));

    let err = FuncSpec::PerColumn(vec![("v".into(), ColumnFuncs::One("sum".into()))])
        .layout(&input)
        .expect_err("nested spec on a series");
    assert_eq!(err.class, ErrorClass::Unsupported);
}

#[test]
fn per_column_layout_goes_multi_level_only_when_nested() {
    let input = GroupedInput {
        columns: vec!["v".into(), "w".into()],
        ndim: 2,
    };

    let flat = FuncSpec::PerColumn(vec![
        ("v".into(), ColumnFuncs::One("sum".into())),
        ("w".into(), ColumnFuncs::One("max".into())),
    ])
    .layout(&input)
    .expect("flat layout");
    assert_eq!(flat.columns, vec![ColumnLabel::single("v"), ColumnLabel::single("w")]);

    let nested = FuncSpec::PerColumn(vec![
        ("v".into(), ColumnFuncs::One("sum".into())),
        ("w".into(), ColumnFuncs::Many(vec!["min".into(), "max".into()])),
    ])
    .layout(&input)
    .expect("nested layout");
    assert_eq!(
        nested.columns,
        vec![
            ColumnLabel::multi(["v", "sum"]),
            ColumnLabel::multi(["w", "min"]),
            ColumnLabel::multi(["w", "max"]),
        ]
    );
}

#[test]
fn func_spec_deserializes_every_shape() {
    let single: FuncSpec = serde_json::from_str(r#""sum""#).expect("single");
    let list: FuncSpec = serde_json::from_str(r#"["sum", "mean"]"#).expect("list");
    let per_column: FuncSpec =
        serde_json::from_str(r#"[["v", "sum"], ["w", ["min", "max"]]]"#).expect("per column");
    let named: FuncSpec =
        serde_json::from_str(r#"[{"alias": "total", "column": "v", "func": "sum"}]"#)
            .expect("named");

    assert_eq!(single, FuncSpec::Single("sum".into()));
    assert_eq!(list, FuncSpec::List(vec!["sum".into(), "mean".into()]));
    assert!(matches!(per_column, FuncSpec::PerColumn(ref entries) if entries.len() == 2));
    assert_eq!(named, FuncSpec::Named(vec![NamedAgg::new("total", "v", "sum")]));
}

#[test]
fn operand_stages_regroup_by_level() {
    let base = operand(GroupByParams::by_columns(["k"]));
    assert_eq!(base.stage(), None);

    let map = base.for_map(base.params().clone());
    assert_eq!(map.stage(), Some(Stage::Map));
    assert_eq!(map.params().by().len(), 1);

    let combine = map.for_combine();
    assert_eq!(combine.stage(), Some(Stage::Combine));
    assert_eq!(combine.params().level(), Some(&[0][..]));
    assert_eq!(combine.raw_params(), base.raw_params());

    let agg = combine.for_agg();
    assert_eq!(agg.stage(), Some(Stage::Agg));
    assert_eq!(agg.combine_size(), AggregationConfig::default().combine_size());
}

#[test]
fn recorder_attaches_only_to_the_returned_clone() {
    use crate::runtime::SizeRecorderHandle;

    let base = operand(GroupByParams::by_columns(["k"]));
    let recorded = base
        .for_map(base.params().clone())
        .with_size_recorder(SizeRecorderHandle::new("probe"));

    assert!(base.size_recorder().is_none());
    assert_eq!(recorded.size_recorder().map(|handle| handle.name()), Some("probe"));
    assert!(recorded.for_combine().size_recorder().is_none());
}
