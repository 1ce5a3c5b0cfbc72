use super::node::Schema;
use crate::model::{FieldDescriptor, FieldShape, ModelDescriptor, ScalarKind};
use crate::tags::Source;

/// Which naming a schema is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    /// Property names come from `form`, else `json`.
    Request,
    /// Property names come from `json` only.
    Response,
}

impl Usage {
    pub fn name_of<'a>(&self, field: &'a FieldDescriptor) -> Option<&'a str> {
        match self {
            Usage::Request => field.request_name(),
            Usage::Response => field.response_name(),
        }
    }
}

pub fn scalar_schema(kind: ScalarKind) -> Schema {
    match kind {
        ScalarKind::Int => Schema::integer(),
        ScalarKind::Int32 => Schema::integer().with_format("int32"),
        ScalarKind::Int64 => Schema::integer().with_format("int64"),
        ScalarKind::Uint => Schema::integer().with_minimum(0.0),
        ScalarKind::Uint32 => Schema::integer().with_format("int32").with_minimum(0.0),
        ScalarKind::Uint64 => Schema::integer().with_format("int64").with_minimum(0.0),
        ScalarKind::Float => Schema::number().with_format("double"),
        ScalarKind::Bool => Schema::boolean(),
        ScalarKind::String => Schema::string(),
        ScalarKind::DateTime => Schema::string().with_format("date-time"),
        ScalarKind::Uuid => Schema::string().with_format("uuid"),
        ScalarKind::Bytes => Schema::string().with_format("byte"),
        ScalarKind::File => Schema::string().with_format("binary"),
    }
}

/// Schema of a type, without any field-level annotations.
pub fn shape_schema(shape: &FieldShape, usage: Usage) -> Schema {
    match shape {
        FieldShape::Scalar(kind) => scalar_schema(*kind),
        FieldShape::Optional(inner) => shape_schema(inner, usage),
        FieldShape::Sequence(inner) => Schema::array(shape_schema(inner, usage)),
        FieldShape::Map => Schema::object(),
        FieldShape::Model(descriptor) => model_schema(descriptor, usage, |_| true),
    }
}

/// Schema of one field: type schema plus constraints, description, default
/// and example.
pub fn field_schema(field: &FieldDescriptor, usage: Usage) -> Schema {
    let mut schema = shape_schema(&field.shape, usage);
    field.constraints.apply(&mut schema);
    schema.description = field.description.clone();
    schema.default = field.default.clone();
    schema.example = field.example.clone();
    schema
}

/// Object schema over the fields of `descriptor` accepted by `include`.
/// Fields without a name for `usage` are left out.
pub fn model_schema(
    descriptor: &ModelDescriptor,
    usage: Usage,
    include: impl Fn(&FieldDescriptor) -> bool,
) -> Schema {
    let mut schema = Schema::object();
    for field in descriptor.fields.iter().filter(|f| include(f)) {
        let Some(name) = usage.name_of(field) else {
            continue;
        };
        schema
            .properties
            .insert(name.to_string(), field_schema(field, usage));
        if field.is_required() && !schema.required.iter().any(|r| r == name) {
            schema.required.push(name.to_string());
        }
    }
    schema
}

/// What the binder reads from a request body.
///
/// Only body-sourced fields are listed. A query, header, cookie or path field
/// stays a parameter even when it also carries a `json` name, because the
/// binder never reads it from the body.
pub fn request_body_schema(descriptor: &ModelDescriptor) -> Schema {
    model_schema(descriptor, Usage::Request, |f| f.source() == Some(Source::Body))
}
