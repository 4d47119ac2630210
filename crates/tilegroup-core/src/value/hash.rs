//! Module: value::hash
//! Responsibility: stable hash derivation for group keys.
//! Does not own: partition assignment policy.
//! Boundary: hash utilities consumed by grouping and unordered shuffle.

use crate::value::Value;
use xxhash_rust::xxh3::xxh3_64;

///
/// StableHash
///
/// Fixed-width key hash. Must not change across releases because shuffle
/// bucket assignment depends on it.
///

pub type StableHash = u64;

const TAG_NULL: u8 = 0x00;
const TAG_BOOL: u8 = 0x01;
const TAG_INT: u8 = 0x02;
const TAG_FLOAT: u8 = 0x03;
const TAG_TEXT: u8 = 0x04;
const TAG_LIST: u8 = 0x05;

/// Hash one value with the stable key-hashing contract.
#[must_use]
pub fn stable_hash_value(value: &Value) -> StableHash {
    let mut buf = Vec::with_capacity(16);
    encode_value(value, &mut buf);

    xxh3_64(&buf)
}

/// Hash one key tuple with the stable key-hashing contract.
#[must_use]
pub fn stable_hash_key(key: &[Value]) -> StableHash {
    let mut buf = Vec::with_capacity(16 * key.len());
    for value in key {
        encode_value(value, &mut buf);
    }

    xxh3_64(&buf)
}

// Integral floats encode as ints so that values equal under canonical
// comparison hash identically.
fn encode_value(value: &Value, buf: &mut Vec<u8>) {
    match value {
        Value::Null => buf.push(TAG_NULL),
        Value::Bool(v) => {
            buf.push(TAG_BOOL);
            buf.push(u8::from(*v));
        }
        Value::Int(v) => encode_int(*v, buf),
        Value::Float(v) => {
            if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 {
                encode_int(*v as i64, buf);
            } else {
                let bits = if v.is_nan() { f64::NAN.to_bits() } else { v.to_bits() };
                buf.push(TAG_FLOAT);
                buf.extend_from_slice(&bits.to_be_bytes());
            }
        }
        Value::Text(v) => {
            buf.push(TAG_TEXT);
            buf.extend_from_slice(&(v.len() as u64).to_be_bytes());
            buf.extend_from_slice(v.as_bytes());
        }
        Value::List(items) => {
            buf.push(TAG_LIST);
            buf.extend_from_slice(&(items.len() as u64).to_be_bytes());
            for item in items {
                encode_value(item, buf);
            }
        }
    }
}

fn encode_int(v: i64, buf: &mut Vec<u8>) {
    buf.push(TAG_INT);
    buf.extend_from_slice(&v.to_be_bytes());
}
