//! # JSON Body Decoding
//!
//! Bodies are decoded with simd-json into `serde_json::Value`, the untyped
//! representation every descriptor field uses.
//!
//! Decoding at the validation boundary is best-effort: a body that cannot be
//! decoded is treated as absent (`null`) rather than aborting the call.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Parse JSON bytes to a typed value using simd-json
///
/// simd-json parses in place, so the input is copied first.
///
/// # Errors
///
/// Returns `Error::Body` if the bytes are not valid JSON for `T`.
pub fn parse_json_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut owned = bytes.to_vec();
    simd_json::from_slice(&mut owned).map_err(|e| Error::Body {
        message: format!("Parse error: {e}"),
    })
}

/// Decode a body for validation
///
/// Empty, non-JSON and truncated bodies all decode to `Value::Null`.
#[must_use]
pub fn decode_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    match parse_json_bytes::<Value>(bytes) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, len = bytes.len(), "Body is not JSON, validating as absent");
            Value::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        name: String,
        age: i32,
    }

    #[test]
    fn test_parse_json_bytes_typed() {
        let user: User = parse_json_bytes(br#"{"name": "Jane", "age": 25}"#).unwrap();
        assert_eq!(user.name, "Jane");
        assert_eq!(user.age, 25);
    }

    #[test]
    fn test_decode_object() {
        let v = decode_body(br#"{"id": "42", "tags": ["a"]}"#);
        assert_eq!(v, json!({ "id": "42", "tags": ["a"] }));
    }

    #[test]
    fn test_decode_tolerates_garbage() {
        assert_eq!(decode_body(b"not json"), Value::Null);
        assert_eq!(decode_body(br#"{"open": "#), Value::Null);
        assert_eq!(decode_body(&[0xff, 0xfe]), Value::Null);
    }

    #[test]
    fn test_decode_empty_is_null() {
        assert_eq!(decode_body(b""), Value::Null);
        assert_eq!(decode_body(b"  \n"), Value::Null);
    }
}
