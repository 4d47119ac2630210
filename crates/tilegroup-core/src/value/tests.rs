use super::*;
use proptest::prelude::*;

#[test]
fn canonical_order_ranks_variants() {
    let ordered = [
        Value::Null,
        Value::Bool(false),
        Value::Bool(true),
        Value::Int(-3),
        Value::Float(-2.5),
        Value::Int(7),
        Value::Text("a".into()),
        Value::Text("b".into()),
        Value::List(vec![Value::Int(1)]),
    ];

    for pair in ordered.windows(2) {
        assert!(pair[0] < pair[1], "{} should sort before {}", pair[0], pair[1]);
    }
}

#[test]
fn integral_float_equals_and_hashes_like_int() {
    assert_eq!(Value::Int(4), Value::Float(4.0));
    assert_eq!(
        stable_hash_value(&Value::Int(4)),
        stable_hash_value(&Value::Float(4.0)),
    );
    assert_ne!(
        stable_hash_value(&Value::Int(4)),
        stable_hash_value(&Value::Float(4.5)),
    );
}

#[test]
fn key_hash_is_sensitive_to_level_order() {
    let ab = stable_hash_key(&[Value::from("a"), Value::from("b")]);
    let ba = stable_hash_key(&[Value::from("b"), Value::from("a")]);

    assert_ne!(ab, ba);
}

#[test]
fn nan_sorts_after_finite_numbers() {
    assert!(Value::Float(f64::NAN) > Value::Float(1e300));
    assert!(Value::Float(f64::NAN) > Value::Int(i64::MAX));
}

#[test]
fn infer_mixes_numeric_and_skips_nulls() {
    let values = [Value::Null, Value::Int(1), Value::Float(2.5)];
    assert_eq!(DType::infer(&values), DType::Float64);

    let mixed = [Value::Int(1), Value::from("x")];
    assert_eq!(DType::infer(&mixed), DType::Object);

    assert_eq!(DType::infer(std::iter::empty()), DType::Object);
}

#[test]
fn cast_rejects_lossy_text_to_number() {
    assert_eq!(Value::from("x").cast(DType::Int64), None);
    assert_eq!(Value::Int(3).cast(DType::Float64), Some(Value::Float(3.0)));
    assert_eq!(Value::Null.cast(DType::Int64), Some(Value::Null));
}

proptest! {
    #[test]
    fn int_float_order_agrees_with_numeric_order(a in -1_000_000i64..1_000_000, b in -1.0e6f64..1.0e6) {
        let expected = (a as f64).partial_cmp(&b).expect("finite inputs");
        prop_assert_eq!(Value::Int(a).cmp(&Value::Float(b)), expected);
        prop_assert_eq!(Value::Float(b).cmp(&Value::Int(a)), expected.reverse());
    }

    #[test]
    fn equal_values_hash_equal(a in -1_000_000i64..1_000_000) {
        prop_assert_eq!(
            stable_hash_key(&[Value::Int(a)]),
            stable_hash_key(&[Value::Float(a as f64)]),
        );
    }
}
