//! # Schema Synthesizer
//!
//! Builds OpenAPI schema nodes from model descriptors. Scalars map through a
//! fixed table, models become objects (embedded fields already flattened by
//! the descriptor), sequences become arrays and maps become untyped objects.
//!
//! Request and response schemas differ only in naming: requests use `form`
//! then `json`, responses use `json`. A field with no name for the usage is
//! silently left out even if it is bound from a header or query.

mod node;
mod synth;

pub use node::{Schema, SchemaType};
pub use synth::{
    field_schema, model_schema, request_body_schema, scalar_schema, shape_schema, Usage,
};
