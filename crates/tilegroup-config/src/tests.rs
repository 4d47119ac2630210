use super::*;

#[test]
fn missing_groupby_table_yields_defaults() {
    let config = AggregationConfig::from_toml_str("").expect("empty document should parse");

    assert_eq!(config, AggregationConfig::default());
    assert_eq!(config.method(), TilingMethod::Auto);
    assert_eq!(config.combine_size(), 4);
    assert_eq!(config.chunk_store_limit(), 128 * 1024 * 1024);
}

#[test]
fn groupby_table_overrides_selected_fields() {
    let config = AggregationConfig::from_toml_str(
        r#"
        [groupby]
        method = "shuffle"
        combine_size = 8
        tree_budget_ratio = 0.5
        "#,
    )
    .expect("config should parse");

    assert_eq!(config.method(), TilingMethod::Shuffle);
    assert_eq!(config.combine_size(), 8);
    assert!((config.tree_budget_ratio() - 0.5).abs() < f64::EPSILON);
    assert_eq!(config.samples_per_partition(), DEFAULT_SAMPLES_PER_PARTITION);
}

#[test]
fn unsupported_method_is_a_fatal_config_error() {
    let err = AggregationConfig::from_toml_str(
        r#"
        [groupby]
        method = "bogus"
        "#,
    )
    .expect_err("unknown method must be rejected");

    assert!(
        matches!(err, ConfigError::UnsupportedMethod(ref method) if method == "bogus"),
        "unexpected error: {err}",
    );
}

#[test]
fn combine_size_below_two_is_rejected() {
    let err = AggregationConfig::default()
        .with_combine_size(1)
        .expect_err("combine_size 1 never converges");

    assert!(matches!(
        err,
        ConfigError::InvalidValue {
            field: "combine_size",
            ..
        }
    ));
}

#[test]
fn tree_budget_ratio_must_be_a_fraction() {
    for ratio in ["0.0", "1.5", "-0.25"] {
        let source = format!("[groupby]\ntree_budget_ratio = {ratio}\n");
        let err = AggregationConfig::from_toml_str(&source)
            .expect_err("ratio outside (0, 1] must be rejected");

        assert!(
            matches!(
                err,
                ConfigError::InvalidValue {
                    field: "tree_budget_ratio",
                    ..
                }
            ),
            "ratio {ratio} produced {err}",
        );
    }
}

#[test]
fn unknown_keys_are_rejected() {
    let err = AggregationConfig::from_toml_str("[groupby]\ncombine = 3\n")
        .expect_err("typos must not be silently ignored");

    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn tree_budget_bytes_scales_store_limit() {
    let config = AggregationConfig::default()
        .with_chunk_store_limit(1_000)
        .expect("positive limit");

    assert!((config.tree_budget_bytes() - 250.0).abs() < f64::EPSILON);
}

#[test]
fn method_round_trips_through_display() {
    for method in [TilingMethod::Auto, TilingMethod::Tree, TilingMethod::Shuffle] {
        let parsed: TilingMethod = method.to_string().parse().expect("display form parses");
        assert_eq!(parsed, method);
    }
}
