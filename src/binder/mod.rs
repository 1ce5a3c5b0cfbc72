//! # Request Binder
//!
//! Fills a model instance from one request in a fixed order:
//! header, cookie, query, path, then the body for `POST` and `PUT`.
//!
//! After decoding, fields still holding their zero value receive their
//! declared default, then every constraint on every field is evaluated. All
//! decode failures, or failing that all validation failures, are returned
//! together; a partially bound instance never leaves this module.

pub mod decode;
mod request;

pub use request::{
    parse_cookies, BindRequest, HeaderVec, MultipartPart, ParamVec, MAX_INLINE_HEADERS,
    MAX_INLINE_PARAMS,
};

use crate::config::BindConfig;
use crate::error::BindError;
use crate::model::{FieldDescriptor, FieldShape, Model, ModelDescriptor, ScalarKind};
use crate::tags::Source;
use crate::validator::ValidationIssue;
use decode::decode_values;
use http::Method;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;

/// Parsed request body.
enum Body<'a> {
    Empty,
    Json(Map<String, Value>),
    Form(Vec<(String, String)>),
    Multipart(&'a [MultipartPart]),
}

/// Immutable request binder; share one per API.
#[derive(Debug, Clone, Default)]
pub struct Binder {
    config: BindConfig,
}

impl Binder {
    pub fn new(config: BindConfig) -> Self {
        Binder { config }
    }

    pub fn config(&self) -> &BindConfig {
        &self.config
    }

    /// Decode, default and validate `T` from `request`.
    pub fn bind<T: Model>(
        &self,
        descriptor: &ModelDescriptor,
        request: &BindRequest,
    ) -> Result<T, BindError> {
        let mut instance = T::default();
        let mut issues = Vec::new();
        let mut present: HashSet<usize> = HashSet::new();

        let query = request.query_pairs();
        for source in [Source::Header, Source::Cookie, Source::Query, Source::Path] {
            for (idx, field) in descriptor.fields.iter().enumerate() {
                let Some(binding) = field.binding.as_ref().filter(|b| b.source == source) else {
                    continue;
                };
                let separator = self.config.header_separator.as_str();
                let (values, separator): (Vec<&str>, Option<&str>) = match source {
                    Source::Header => (request.header_values(&binding.name), Some(separator)),
                    Source::Cookie => (
                        request.get_cookie(&binding.name).into_iter().collect(),
                        Some(separator),
                    ),
                    Source::Query => (
                        query
                            .iter()
                            .filter(|(k, _)| *k == binding.name)
                            .map(|(_, v)| v.as_str())
                            .collect(),
                        Some(","),
                    ),
                    Source::Path | Source::Body => (
                        request.get_path_param(&binding.name).into_iter().collect(),
                        None,
                    ),
                };
                self.store(&mut instance, field, &values, separator, &mut issues, &mut present, idx);
            }
        }

        if request.method == Method::POST || request.method == Method::PUT {
            self.bind_body(descriptor, request, &mut instance, &mut issues, &mut present);
        }

        if !issues.is_empty() {
            debug!(model = descriptor.name, issues = issues.len(), "request decode failed");
            return Err(BindError::Decode(issues));
        }

        for (idx, field) in descriptor.fields.iter().enumerate() {
            let Some(default) = &field.default else { continue };
            let current = instance.read(&field.path).unwrap_or(Value::Null);
            if current == field.zero || current.is_null() {
                if let Err(e) = instance.assign(&field.path, default.clone()) {
                    issues.push(issue(field, "decode", e.to_string()));
                    continue;
                }
                present.insert(idx);
            }
        }
        if !issues.is_empty() {
            return Err(BindError::Decode(issues));
        }

        for (idx, field) in descriptor.fields.iter().enumerate() {
            let value = instance.read(&field.path).unwrap_or(Value::Null);
            validate_field(field, &value, present.contains(&idx), &location(field), &mut issues);
        }
        if !issues.is_empty() {
            debug!(model = descriptor.name, issues = issues.len(), "request validation failed");
            return Err(BindError::Validation(issues));
        }

        debug!(model = descriptor.name, "request bound");
        Ok(instance)
    }

    #[allow(clippy::too_many_arguments)]
    fn store<T: Model>(
        &self,
        instance: &mut T,
        field: &FieldDescriptor,
        values: &[&str],
        separator: Option<&str>,
        issues: &mut Vec<ValidationIssue>,
        present: &mut HashSet<usize>,
        idx: usize,
    ) {
        match decode_values(values, &field.shape, separator) {
            Ok(Some(value)) => self.assign(instance, field, value, issues, present, idx),
            Ok(None) => {}
            Err(message) => issues.push(issue(field, "decode", message)),
        }
    }

    fn assign<T: Model>(
        &self,
        instance: &mut T,
        field: &FieldDescriptor,
        value: Value,
        issues: &mut Vec<ValidationIssue>,
        present: &mut HashSet<usize>,
        idx: usize,
    ) {
        match instance.assign(&field.path, value) {
            Ok(_) => {
                present.insert(idx);
            }
            Err(e) => issues.push(issue(field, "decode", e.to_string())),
        }
    }

    fn bind_body<T: Model>(
        &self,
        descriptor: &ModelDescriptor,
        request: &BindRequest,
        instance: &mut T,
        issues: &mut Vec<ValidationIssue>,
        present: &mut HashSet<usize>,
    ) {
        let body = match parse_body(request) {
            Ok(body) => body,
            Err(message) => {
                issues.push(ValidationIssue::new("body", "body", "decode", message));
                return;
            }
        };

        for (idx, field) in descriptor.fields.iter().enumerate() {
            if field.source() != Some(Source::Body) {
                continue;
            }
            let Some(name) = field.request_name() else { continue };
            match &body {
                Body::Empty => {}
                Body::Json(object) => {
                    if let Some(value) = object.get(name) {
                        self.assign(instance, field, value.clone(), issues, present, idx);
                    }
                }
                Body::Form(pairs) => {
                    let values: Vec<&str> = pairs
                        .iter()
                        .filter(|(k, _)| k == name)
                        .map(|(_, v)| v.as_str())
                        .collect();
                    self.store(instance, field, &values, Some(","), issues, present, idx);
                }
                Body::Multipart(parts) => {
                    let matching: Vec<&MultipartPart> =
                        parts.iter().filter(|p| p.name == name).collect();
                    if matching.is_empty() {
                        continue;
                    }
                    if is_file_field(&field.shape) {
                        match file_value(&matching, &field.shape) {
                            Ok(value) => self.assign(instance, field, value, issues, present, idx),
                            Err(message) => issues.push(issue(field, "decode", message)),
                        }
                    } else {
                        let texts: Vec<String> = matching
                            .iter()
                            .filter(|p| !p.is_file())
                            .map(|p| String::from_utf8_lossy(&p.data).into_owned())
                            .collect();
                        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
                        self.store(instance, field, &refs, Some(","), issues, present, idx);
                    }
                }
            }
        }
    }
}

fn parse_body(request: &BindRequest) -> Result<Body<'_>, String> {
    let media = request.media_type().unwrap_or_default();
    if !request.parts.is_empty() || media == "multipart/form-data" {
        return Ok(Body::Multipart(&request.parts));
    }
    if request.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Body::Empty);
    }
    if media.is_empty() || media == "application/json" || media.ends_with("+json") {
        return match serde_json::from_slice::<Value>(&request.body) {
            Ok(Value::Object(object)) => Ok(Body::Json(object)),
            Ok(_) => Err("JSON body must be an object".to_string()),
            Err(e) => Err(format!("invalid JSON body: {e}")),
        };
    }
    if media == "application/x-www-form-urlencoded" {
        return Ok(Body::Form(
            url::form_urlencoded::parse(&request.body)
                .into_owned()
                .collect(),
        ));
    }
    Err(format!("unsupported content type `{media}`"))
}

fn is_file_field(shape: &FieldShape) -> bool {
    match shape.required_shape() {
        FieldShape::Scalar(ScalarKind::File) => true,
        FieldShape::Sequence(item) => {
            matches!(item.required_shape(), FieldShape::Scalar(ScalarKind::File))
        }
        _ => false,
    }
}

fn file_value(parts: &[&MultipartPart], shape: &FieldShape) -> Result<Value, String> {
    let files: Vec<Value> = parts
        .iter()
        .filter(|p| p.is_file())
        .map(|p| serde_json::to_value(p.to_uploaded_file()).map_err(|e| e.to_string()))
        .collect::<Result<_, _>>()?;
    if shape.is_sequence() {
        return Ok(Value::Array(files));
    }
    files
        .into_iter()
        .next()
        .ok_or_else(|| "expected a file part".to_string())
}

fn location(field: &FieldDescriptor) -> String {
    match &field.binding {
        Some(b) => format!("{}.{}", b.source, b.name),
        None => field.ident.to_string(),
    }
}

fn wire_name(field: &FieldDescriptor) -> String {
    field
        .binding
        .as_ref()
        .map(|b| b.name.clone())
        .unwrap_or_else(|| field.ident.to_string())
}

fn issue(field: &FieldDescriptor, kind: &str, message: impl Into<String>) -> ValidationIssue {
    ValidationIssue::new(location(field), wire_name(field), kind, message)
}

/// Check one field and, for nested body models, every nested field.
fn validate_field(
    field: &FieldDescriptor,
    value: &Value,
    present: bool,
    location: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    let name = field
        .binding
        .as_ref()
        .map(|b| b.name.as_str())
        .or_else(|| field.request_name())
        .unwrap_or(field.ident);
    for (operator, message) in field.constraints.violations(value, &field.zero, present) {
        issues.push(ValidationIssue::new(location, name, operator, message));
    }
    if !present {
        return;
    }
    match field.shape.required_shape() {
        FieldShape::Model(nested) => validate_nested(nested, value, location, issues),
        FieldShape::Sequence(item) => {
            if let (FieldShape::Model(nested), Value::Array(elems)) = (item.required_shape(), value)
            {
                for (i, elem) in elems.iter().enumerate() {
                    validate_nested(nested, elem, &format!("{location}[{i}]"), issues);
                }
            }
        }
        _ => {}
    }
}

fn validate_nested(
    nested: &ModelDescriptor,
    value: &Value,
    location: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    let Value::Object(object) = value else { return };
    for field in &nested.fields {
        let Some(name) = field.request_name() else { continue };
        let inner = object.get(name).cloned().unwrap_or(Value::Null);
        let present = !inner.is_null() && inner != field.zero;
        validate_field(field, &inner, present, &format!("{location}.{name}"), issues);
    }
}
