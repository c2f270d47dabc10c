//! Canonical CBOR encoding for deterministic digests.
//!
//! Every digested structure is first rendered as a JSON-shaped value and then
//! encoded following RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - Floats always use the 64-bit form
//!
//! Maps are the only place where ordering is normalized. Arrays are encoded
//! positionally, so order-significant data (the overlay sequence of a bundle,
//! entry code lists) must be represented as arrays and order-insignificant
//! data (attribute maps, payload maps) as maps.

use ciborium::value::{Integer, Value};
use serde_json::Value as JsonValue;

use crate::error::{CoreError, Result};

/// Domain separation prefix for capture base digests.
pub const CAPTURE_BASE_DOMAIN: &[u8] = b"oca/capture-base/v2";

/// Domain separation prefix for overlay digests.
pub const OVERLAY_DOMAIN: &[u8] = b"oca/overlay/v2";

/// Domain separation prefix for bundle digests.
pub const BUNDLE_DOMAIN: &[u8] = b"oca/bundle/v2";

/// Encode a JSON value to canonical CBOR bytes.
pub fn canonical_bytes(value: &JsonValue) -> Result<Vec<u8>> {
    let cbor = json_to_cbor(value)?;
    let mut buf = Vec::new();
    encode_value_to(&mut buf, &cbor)?;
    Ok(buf)
}

/// Convert a JSON value into the CBOR data model.
fn json_to_cbor(value: &JsonValue) -> Result<Value> {
    Ok(match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(u) = n.as_u64() {
                Value::Integer(u.into())
            } else if let Some(i) = n.as_i64() {
                Value::Integer(i.into())
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                return Err(CoreError::EncodingError(format!("unrepresentable number {n}")));
            }
        }
        JsonValue::String(s) => Value::Text(s.clone()),
        JsonValue::Array(items) => {
            Value::Array(items.iter().map(json_to_cbor).collect::<Result<Vec<_>>>()?)
        }
        JsonValue::Object(map) => Value::Map(
            map.iter()
                .map(|(k, v)| Ok((Value::Text(k.clone()), json_to_cbor(v)?)))
                .collect::<Result<Vec<_>>>()?,
        ),
    })
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => encode_array(buf, arr)?,
        Value::Map(entries) => encode_map_canonical(buf, entries)?,
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Float(f) => {
            buf.push(0xfb);
            buf.extend_from_slice(&f.to_be_bytes());
        }
        other => {
            return Err(CoreError::EncodingError(format!(
                "unsupported CBOR value in canonical encoding: {other:?}"
            )))
        }
    }
    Ok(())
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        let abs = (-1 - n) as u64;
        encode_uint(buf, 1, abs);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode an array (major type 4). Element order is preserved.
fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) -> Result<()> {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item)?;
    }
    Ok(())
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<()> {
    let mut key_value_pairs: Vec<(Vec<u8>, &Value)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::new();
            encode_value_to(&mut key_buf, k)?;
            Ok((key_buf, v))
        })
        .collect::<Result<_>>()?;

    key_value_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, key_value_pairs.len() as u64);
    for (key_bytes, value) in key_value_pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_encoding_deterministic() {
        let value = json!({"b": 1, "a": [true, null, "x"], "c": {"z": 1, "y": 2}});
        assert_eq!(canonical_bytes(&value).unwrap(), canonical_bytes(&value).unwrap());
    }

    #[test]
    fn test_map_key_order_is_irrelevant() {
        let mut first = serde_json::Map::new();
        first.insert("name".into(), json!("Text"));
        first.insert("age".into(), json!("Numeric"));

        let mut second = serde_json::Map::new();
        second.insert("age".into(), json!("Numeric"));
        second.insert("name".into(), json!("Text"));

        assert_eq!(
            canonical_bytes(&JsonValue::Object(first)).unwrap(),
            canonical_bytes(&JsonValue::Object(second)).unwrap()
        );
    }

    #[test]
    fn test_array_order_is_significant() {
        let a = canonical_bytes(&json!(["x", "y"])).unwrap();
        let b = canonical_bytes(&json!(["y", "x"])).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();

        encode_uint(&mut buf, 0, 0);
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);

        buf.clear();
        encode_integer(&mut buf, (-1i64).into());
        assert_eq!(buf, vec![0x20]);
    }

    #[test]
    fn test_text_keys_sorted_by_encoded_bytes() {
        // Shorter keys sort first because the length prefix is compared first.
        let bytes = canonical_bytes(&json!({"bb": 1, "a": 2, "c": 3})).unwrap();
        assert_eq!(bytes[0], 0xa3);
        assert_eq!(&bytes[1..3], &[0x61, b'a']);
        assert_eq!(&bytes[4..6], &[0x61, b'c']);
        assert_eq!(&bytes[7..10], &[0x62, b'b', b'b']);
    }

    #[test]
    fn test_byte_strings_are_rejected() {
        let mut buf = Vec::new();
        let err = encode_value_to(&mut buf, &Value::Bytes(vec![1, 2, 3])).unwrap_err();
        assert!(matches!(err, CoreError::EncodingError(_)));
    }

    #[test]
    fn test_output_is_valid_cbor() {
        let value = json!({"type": "overlay/label/2.0.0", "attribute_labels": {"name": "Name"}, "n": 1.5});
        let bytes = canonical_bytes(&value).unwrap();

        let decoded: Value = ciborium::from_reader(bytes.as_slice()).unwrap();
        match decoded {
            Value::Map(entries) => assert_eq!(entries.len(), 3),
            other => panic!("expected map, got {other:?}"),
        }
    }
}
