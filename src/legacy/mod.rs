//! Reader and writer for the compact type-tagged legacy serialization format.
//!
//! ```text
//! N;                      null
//! b:1;                    boolean
//! i:42;                   integer
//! d:0.5;                  float
//! s:5:"hello";            byte-length prefixed string
//! a:2:{i:0;s:1:"x";i:1;N;}            ordered array
//! O:8:"stdClass":1:{s:1:"a";i:1;}     object
//! ```
//!
//! Decoded values are returned as ordered `serde_json` containers.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Number, Value};

use crate::error::SqlComposeError;

mod decode;

pub use decode::decode;

static SIZED_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[aOs]:[0-9]+:").expect("valid sized prefix pattern"));
static SCALAR_BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[bid]:[0-9.E+-]+;$").expect("valid scalar pattern"));

/// Cheap structural check deciding whether `text` looks like legacy-serialized data.
///
/// Only the shape is checked; a `true` result can still fail to [`decode`].
#[must_use]
pub fn is_serialized(text: &str) -> bool {
    let data = text.trim();
    if data == "N;" {
        return true;
    }
    let bytes = data.as_bytes();
    if bytes.len() < 4 || bytes[1] != b':' {
        return false;
    }
    let last = bytes[bytes.len() - 1];
    if last != b';' && last != b'}' {
        return false;
    }
    match bytes[0] {
        b's' => bytes[bytes.len() - 2] == b'"' && SIZED_PREFIX.is_match(data),
        b'a' | b'O' => SIZED_PREFIX.is_match(data),
        b'b' | b'i' | b'd' => SCALAR_BODY.is_match(data),
        _ => false,
    }
}

/// Encode a JSON value in the legacy format.
///
/// Arrays and objects both become `a:` arrays; object keys that are plain
/// integers are written as integer keys.
#[must_use]
pub fn encode(value: &Value) -> String {
    let mut out = String::new();
    encode_into(value, &mut out);
    out
}

fn encode_into(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("N;"),
        Value::Bool(b) => out.push_str(if *b { "b:1;" } else { "b:0;" }),
        Value::Number(n) => encode_number(n, out),
        Value::String(s) => encode_string(s, out),
        Value::Array(items) => {
            out.push_str(&format!("a:{}:{{", items.len()));
            for (i, item) in items.iter().enumerate() {
                out.push_str(&format!("i:{i};"));
                encode_into(item, out);
            }
            out.push('}');
        }
        Value::Object(map) => encode_map(map, out),
    }
}

fn encode_number(n: &Number, out: &mut String) {
    if let Some(i) = n.as_i64() {
        out.push_str(&format!("i:{i};"));
    } else if let Some(f) = n.as_f64() {
        out.push_str(&format!("d:{f};"));
    }
}

fn encode_string(s: &str, out: &mut String) {
    out.push_str(&format!("s:{}:\"{s}\";", s.len()));
}

fn encode_map(map: &Map<String, Value>, out: &mut String) {
    out.push_str(&format!("a:{}:{{", map.len()));
    for (key, item) in map {
        match key.parse::<i64>() {
            Ok(i) if i.to_string() == *key => out.push_str(&format!("i:{i};")),
            _ => encode_string(key, out),
        }
        encode_into(item, out);
    }
    out.push('}');
}

pub(crate) fn decode_error(offset: usize, message: impl Into<String>) -> SqlComposeError {
    SqlComposeError::legacy(offset, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_scalars() {
        assert!(is_serialized("N;"));
        assert!(is_serialized("b:1;"));
        assert!(is_serialized("i:-42;"));
        assert!(is_serialized("d:1.5E+3;"));
        assert!(is_serialized("  s:3:\"abc\";  "));
        assert!(!is_serialized("i:abc;"));
        assert!(!is_serialized("s:3:\"abc\""));
        assert!(!is_serialized("hello"));
    }

    #[test]
    fn classifies_containers() {
        assert!(is_serialized("a:1:{i:0;i:1;}"));
        assert!(is_serialized("O:8:\"stdClass\":0:{}"));
        assert!(!is_serialized("a:x:{}"));
        assert!(!is_serialized("x:1:{}"));
    }

    #[test]
    fn encodes_nested_values() {
        let value = json!({"name": "Ana", "tags": ["a", "b"], "3": null});
        assert_eq!(
            encode(&value),
            "a:3:{s:4:\"name\";s:3:\"Ana\";s:4:\"tags\";a:2:{i:0;s:1:\"a\";i:1;s:1:\"b\";}i:3;N;}"
        );
    }

    #[test]
    fn string_length_counts_bytes() {
        assert_eq!(encode(&json!("é")), "s:2:\"é\";");
    }

    #[test]
    fn encode_then_decode_preserves_structure() {
        let value = json!({"a": 1, "b": [true, 2.5, "x"]});
        assert_eq!(decode(&encode(&value)).expect("decodes"), value);
    }
}
