//! String-to-value conversion shared by request binding and `default` /
//! `example` literals.

use crate::model::{FieldShape, ScalarKind};
use base64::Engine;
use serde_json::Value;

/// Accepted boolean spellings: `1 t T TRUE true True` and
/// `0 f F FALSE false False`.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

pub fn decode_scalar(raw: &str, kind: ScalarKind) -> Result<Value, String> {
    let trimmed = raw.trim();
    match kind {
        ScalarKind::Int | ScalarKind::Int32 | ScalarKind::Int64 => {
            let n = trimmed
                .parse::<i64>()
                .map_err(|_| format!("`{raw}` is not an integer"))?;
            if kind == ScalarKind::Int32 && i32::try_from(n).is_err() {
                return Err(format!("`{raw}` is out of range for int32"));
            }
            Ok(Value::from(n))
        }
        ScalarKind::Uint | ScalarKind::Uint32 | ScalarKind::Uint64 => {
            let n = trimmed
                .parse::<u64>()
                .map_err(|_| format!("`{raw}` is not an unsigned integer"))?;
            if kind == ScalarKind::Uint32 && u32::try_from(n).is_err() {
                return Err(format!("`{raw}` is out of range for uint32"));
            }
            Ok(Value::from(n))
        }
        ScalarKind::Float => {
            let f = trimmed
                .parse::<f64>()
                .map_err(|_| format!("`{raw}` is not a number"))?;
            serde_json::Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| format!("`{raw}` is not a finite number"))
        }
        ScalarKind::Bool => parse_bool(trimmed)
            .map(Value::Bool)
            .ok_or_else(|| format!("`{raw}` is not a boolean")),
        ScalarKind::String => Ok(Value::String(raw.to_string())),
        ScalarKind::DateTime => chrono::DateTime::parse_from_rfc3339(trimmed)
            .map(|dt| Value::String(dt.to_rfc3339()))
            .map_err(|e| format!("`{raw}` is not an RFC 3339 date-time: {e}")),
        ScalarKind::Uuid => uuid::Uuid::parse_str(trimmed)
            .map(|u| Value::String(u.to_string()))
            .map_err(|e| format!("`{raw}` is not a uuid: {e}")),
        ScalarKind::Bytes => base64::engine::general_purpose::STANDARD
            .decode(trimmed.as_bytes())
            .map(|_| Value::String(trimmed.to_string()))
            .map_err(|e| format!("`{raw}` is not base64: {e}")),
        ScalarKind::File => Err("files can only be bound from multipart file parts".to_string()),
    }
}

/// Decode one textual value for a non-repeated position of `shape`.
pub fn decode_one(raw: &str, shape: &FieldShape) -> Result<Value, String> {
    match shape {
        FieldShape::Scalar(kind) => decode_scalar(raw, *kind),
        FieldShape::Optional(inner) => decode_one(raw, inner),
        FieldShape::Sequence(_) | FieldShape::Model(_) | FieldShape::Map => {
            serde_json::from_str(raw).map_err(|e| format!("`{raw}` is not valid JSON: {e}"))
        }
    }
}

/// Decode every value received for one field. Repeated fields take every
/// value, each split on `separator` when one is given; other fields take the
/// first value verbatim. `None` when nothing was received.
pub fn decode_values(
    values: &[&str],
    shape: &FieldShape,
    separator: Option<&str>,
) -> Result<Option<Value>, String> {
    if values.is_empty() {
        return Ok(None);
    }
    match shape.required_shape() {
        FieldShape::Sequence(item) => {
            let mut out = Vec::new();
            for value in values {
                match separator {
                    Some(sep) if !sep.is_empty() => {
                        for piece in value.split(sep).map(str::trim).filter(|s| !s.is_empty()) {
                            out.push(decode_one(piece, item)?);
                        }
                    }
                    _ => out.push(decode_one(value, item)?),
                }
            }
            Ok(Some(Value::Array(out)))
        }
        other => decode_one(values[0], other).map(Some),
    }
}

/// Convert a `default` or `example` literal. Repeated fields read a comma
/// separated list.
pub fn decode_literal(literal: &str, shape: &FieldShape) -> Result<Value, String> {
    match shape.required_shape() {
        FieldShape::Sequence(_) => {
            decode_values(&[literal], shape, Some(",")).map(|v| v.unwrap_or(Value::Array(vec![])))
        }
        other => decode_one(literal, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seq(kind: ScalarKind) -> FieldShape {
        FieldShape::Sequence(Box::new(FieldShape::Scalar(kind)))
    }

    #[test]
    fn test_bool_spellings() {
        for t in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool(t), Some(true));
        }
        for f in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool(f), Some(false));
        }
        assert_eq!(parse_bool("yes"), None);
    }

    #[test]
    fn test_scalar_kinds() {
        assert_eq!(decode_scalar("42", ScalarKind::Int64).unwrap(), json!(42));
        assert!(decode_scalar("-1", ScalarKind::Uint).is_err());
        assert!(decode_scalar("3000000000", ScalarKind::Int32).is_err());
        assert_eq!(decode_scalar("1.5", ScalarKind::Float).unwrap(), json!(1.5));
        assert!(decode_scalar("NaN", ScalarKind::Float).is_err());
        assert_eq!(decode_scalar(" a ", ScalarKind::String).unwrap(), json!(" a "));
        assert!(decode_scalar("not-a-uuid", ScalarKind::Uuid).is_err());
        assert!(decode_scalar("2024-01-02T03:04:05Z", ScalarKind::DateTime).is_ok());
        assert!(decode_scalar("x", ScalarKind::File).is_err());
    }

    #[test]
    fn test_sequences_split_scalars_do_not() {
        let scalar = FieldShape::Scalar(ScalarKind::String);
        assert_eq!(
            decode_values(&["a,b,c"], &scalar, Some(",")).unwrap(),
            Some(json!("a,b,c"))
        );
        assert_eq!(
            decode_values(&["a, b", "c"], &seq(ScalarKind::String), Some(",")).unwrap(),
            Some(json!(["a", "b", "c"]))
        );
        assert_eq!(decode_values(&[], &scalar, Some(",")).unwrap(), None);
    }

    #[test]
    fn test_literals() {
        assert_eq!(decode_literal("1,2", &seq(ScalarKind::Uint32)).unwrap(), json!([1, 2]));
        assert!(decode_literal("abc", &FieldShape::Scalar(ScalarKind::Int)).is_err());
        assert_eq!(decode_literal(r#"{"k":1}"#, &FieldShape::Map).unwrap(), json!({"k": 1}));
    }
}
