//! Tag names against serde names.
//!
//! Nested body models are decoded and handler output is encoded by serde,
//! while schemas use tag names. A sample keyed by tag names is pushed through
//! serde and whatever comes back must still carry every tag name.

use super::descriptor::{FieldDescriptor, FieldShape};
use super::shape::{ScalarKind, UploadedFile};
use crate::schema::Usage;
use serde_json::{Map, Value};

/// True when `shape` reaches a model through any container.
pub fn contains_model(shape: &FieldShape) -> bool {
    match shape {
        FieldShape::Model(_) => true,
        FieldShape::Optional(inner) | FieldShape::Sequence(inner) => contains_model(inner),
        FieldShape::Scalar(_) | FieldShape::Map => false,
    }
}

fn sample_key<'a>(field: &'a FieldDescriptor, usage: Usage) -> &'a str {
    usage.name_of(field).unwrap_or(field.ident)
}

fn sample_scalar(kind: ScalarKind) -> Value {
    match kind {
        ScalarKind::Float => Value::from(0.0),
        ScalarKind::Bool => Value::Bool(false),
        ScalarKind::String | ScalarKind::Bytes => Value::String(String::new()),
        ScalarKind::DateTime => Value::from("1970-01-01T00:00:00Z"),
        ScalarKind::Uuid => Value::from(uuid::Uuid::nil().to_string()),
        ScalarKind::File => serde_json::to_value(UploadedFile::default()).unwrap_or(Value::Null),
        _ => Value::from(0),
    }
}

/// A value serde accepts for `shape`. Objects are keyed by `usage` names,
/// falling back to the Rust ident; options are filled and sequences hold one
/// element so nothing is skipped on the way back.
pub fn sample_value(shape: &FieldShape, usage: Usage) -> Value {
    match shape {
        FieldShape::Scalar(kind) => sample_scalar(*kind),
        FieldShape::Optional(inner) => sample_value(inner, usage),
        FieldShape::Sequence(inner) => Value::Array(vec![sample_value(inner, usage)]),
        FieldShape::Map => Value::Object(Map::new()),
        FieldShape::Model(descriptor) => Value::Object(
            descriptor
                .fields
                .iter()
                .map(|f| (sample_key(f, usage).to_string(), sample_value(&f.shape, usage)))
                .collect(),
        ),
    }
}

/// First tag name, under any of `usages`, that `written` does not carry.
pub fn missing_name(shape: &FieldShape, written: &Value, usages: &[Usage]) -> Option<String> {
    match shape {
        FieldShape::Optional(inner) => missing_name(inner, written, usages),
        FieldShape::Sequence(inner) => match written {
            Value::Array(items) => items.first().and_then(|item| missing_name(inner, item, usages)),
            _ => Some("a sequence is not written as an array".to_string()),
        },
        FieldShape::Model(descriptor) => {
            let Value::Object(object) = written else {
                return Some(format!("{} is not written as an object", descriptor.name));
            };
            for field in &descriptor.fields {
                let mut found = None;
                for name in usages.iter().filter_map(|u| u.name_of(field)) {
                    match object.get(name) {
                        Some(value) => found = Some(value),
                        None => {
                            return Some(format!(
                                "{}.{} is not read or written as `{name}`",
                                descriptor.name, field.ident
                            ))
                        }
                    }
                }
                if let Some(missing) = found.and_then(|v| missing_name(&field.shape, v, usages)) {
                    return Some(missing);
                }
            }
            None
        }
        FieldShape::Scalar(_) | FieldShape::Map => None,
    }
}

/// Push a sample of `shape` through `roundtrip` and require every tag name
/// to survive.
pub fn check_names(
    shape: &FieldShape,
    sample: Usage,
    usages: &[Usage],
    roundtrip: impl FnOnce(Value) -> Result<Value, String>,
) -> Result<(), String> {
    let written = roundtrip(sample_value(shape, sample))?;
    match missing_name(shape, &written, usages) {
        Some(missing) => Err(missing),
        None => Ok(()),
    }
}
