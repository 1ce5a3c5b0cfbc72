//! # Document Assembler
//!
//! Collects every registered, non-excluded operation into one OpenAPI 3.0
//! document. Path templates are normalised (`/items/:id` -> `/items/{id}`),
//! security schemes are registered under their provider id the first time a
//! route uses them, and request bodies are only emitted for `POST` and `PUT`.
//!
//! The document is rebuilt from scratch on every [`crate::Api::init`] and
//! published through a [`DocumentHandle`], so readers never see a partially
//! built document.

use crate::config::DocsConfig;
use crate::error::ConfigError;
use crate::model::{check_names, contains_model, DescriptorCache, ModelDescriptor};
use crate::route::Route;
use crate::schema::{field_schema, request_body_schema, shape_schema, Schema, Usage};
use crate::security::SecurityScheme;
use crate::tags::Source;
use anyhow::Context;
use arc_swap::ArcSwap;
use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

#[allow(clippy::expect_used)]
static PATH_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/:(\w+)").expect("path parameter pattern is valid"));

/// Rewrite `/:name` segments to `/{name}`. Idempotent.
pub fn normalize_path(path: &str) -> String {
    PATH_PARAM.replace_all(path, "/{${1}}").into_owned()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Info {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms_of_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    pub schema: Schema,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaType {
    pub schema: Schema,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestBody {
    pub required: bool,
    pub content: BTreeMap<String, MediaType>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub content: BTreeMap<String, MediaType>,
}

/// `{provider id: []}`; one entry per alternative.
pub type SecurityRequirement = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: BTreeMap<String, Response>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<SecurityRequirement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub security_schemes: BTreeMap<String, SecurityScheme>,
}

impl Components {
    fn is_empty(&self) -> bool {
        self.security_schemes.is_empty()
    }
}

/// Assembled OpenAPI document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Document {
    pub openapi: String,
    pub info: Info,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    /// Normalised path -> lower-case method -> operation.
    pub paths: BTreeMap<String, BTreeMap<String, Operation>>,
    #[serde(skip_serializing_if = "Components::is_empty")]
    pub components: Components,
}

/// A route as registered, with its request descriptor.
pub struct RegisteredRoute<'a> {
    pub path: &'a str,
    pub method: &'a Method,
    pub route: &'a Route,
    pub descriptor: &'a ModelDescriptor,
}

impl Document {
    /// A document with `info` and `servers` filled from configuration and no
    /// paths.
    pub fn empty(docs: &DocsConfig) -> Self {
        Document {
            openapi: docs.openapi_version.clone(),
            info: Info {
                title: docs.title.clone(),
                description: docs.description.clone(),
                terms_of_service: docs.terms_of_service.clone(),
                contact: docs.contact.clone(),
                license: docs.license.clone(),
                version: docs.version.clone(),
            },
            servers: docs.servers.clone(),
            paths: BTreeMap::new(),
            components: Components::default(),
        }
    }

    pub fn assemble<'a>(
        docs: &DocsConfig,
        routes: impl IntoIterator<Item = RegisteredRoute<'a>>,
        cache: &DescriptorCache,
    ) -> Result<Self, ConfigError> {
        let mut doc = Document::empty(docs);
        for registered in routes {
            if registered.route.exclude {
                continue;
            }
            let operation = doc.operation(&registered, cache)?;
            doc.paths
                .entry(normalize_path(registered.path))
                .or_default()
                .insert(registered.method.as_str().to_ascii_lowercase(), operation);
        }
        info!(
            title = %doc.info.title,
            paths = doc.paths.len(),
            schemes = doc.components.security_schemes.len(),
            "openapi document assembled"
        );
        Ok(doc)
    }

    fn operation(
        &mut self,
        registered: &RegisteredRoute<'_>,
        cache: &DescriptorCache,
    ) -> Result<Operation, ConfigError> {
        let route = registered.route;
        let descriptor = registered.descriptor;

        let mut security = Vec::new();
        for provider in &route.security {
            let id = provider.provider().to_string();
            self.components
                .security_schemes
                .entry(id.clone())
                .or_insert_with(|| provider.scheme());
            security.push(BTreeMap::from([(id, Vec::new())]));
        }

        let request_body = if (*registered.method == Method::POST
            || *registered.method == Method::PUT)
            && descriptor.has_body_fields()
        {
            let content_type = route
                .request_content_type
                .clone()
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
            Some(RequestBody {
                required: true,
                content: BTreeMap::from([(
                    content_type,
                    MediaType {
                        schema: request_body_schema(descriptor),
                    },
                )]),
            })
        } else {
            None
        };

        let response_content_type = route
            .response_content_type
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let mut responses = BTreeMap::new();
        for (status, spec) in &route.responses {
            let mut content = BTreeMap::new();
            if let Some(shape) = &spec.shape {
                let resolved = cache.resolve(shape)?;
                if let (Some(roundtrip), true) = (spec.roundtrip, contains_model(&resolved)) {
                    check_names(&resolved, Usage::Response, &[Usage::Response], roundtrip).map_err(
                        |reason| ConfigError::NameMismatch {
                            model: descriptor.name.to_string(),
                            field: format!("response {status}"),
                            reason,
                        },
                    )?;
                }
                content.insert(
                    response_content_type.clone(),
                    MediaType {
                        schema: shape_schema(&resolved, Usage::Response),
                    },
                );
            }
            responses.insert(
                status.clone(),
                Response {
                    description: spec.description.clone(),
                    content,
                },
            );
        }

        Ok(Operation {
            tags: route.tags.clone(),
            operation_id: route.operation_id.clone(),
            summary: route.summary.clone(),
            description: route.description.clone(),
            deprecated: route.deprecated,
            parameters: parameters(descriptor),
            request_body,
            responses,
            security,
        })
    }

    pub fn operation_at(&self, path: &str, method: &Method) -> Option<&Operation> {
        self.paths
            .get(&normalize_path(path))?
            .get(&method.as_str().to_ascii_lowercase())
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("serializing document as JSON")
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        serde_yaml::to_string(self).context("serializing document as YAML")
    }

    pub fn to_value(&self) -> anyhow::Result<serde_json::Value> {
        serde_json::to_value(self).context("serializing document")
    }

    /// Re-read the document as a typed `oas3` spec.
    pub fn to_openapi_spec(&self) -> anyhow::Result<oas3::OpenApiV3Spec> {
        serde_json::from_value(self.to_value()?).context("document is not a valid OpenAPI 3 spec")
    }
}

/// Header, cookie, query and path fields in declaration order.
fn parameters(descriptor: &ModelDescriptor) -> Vec<Parameter> {
    descriptor
        .fields
        .iter()
        .filter_map(|field| {
            let binding = field.binding.as_ref()?;
            let location = binding.source.parameter_in()?;
            Some(Parameter {
                name: binding.name.clone(),
                location: location.to_string(),
                description: field.description.clone(),
                required: binding.source == Source::Path || field.is_required(),
                schema: Schema {
                    description: None,
                    ..field_schema(field, Usage::Request)
                },
            })
        })
        .collect()
}

/// Lock-free holder of the latest published document.
pub struct DocumentHandle {
    current: ArcSwap<Document>,
}

impl DocumentHandle {
    pub fn new(initial: Document) -> Self {
        DocumentHandle {
            current: ArcSwap::from_pointee(initial),
        }
    }

    pub fn load(&self) -> Arc<Document> {
        self.current.load_full()
    }

    pub fn publish(&self, document: Document) {
        self.current.store(Arc::new(document));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/items/:id"), "/items/{id}");
        assert_eq!(normalize_path("/a/:x/b/:y_z"), "/a/{x}/b/{y_z}");
        assert_eq!(normalize_path("/plain"), "/plain");
        let once = normalize_path("/users/:id/posts/:post");
        assert_eq!(normalize_path(&once), once);
    }

    #[test]
    fn test_handle_publishes_whole_documents() {
        let docs = DocsConfig::default();
        let handle = DocumentHandle::new(Document::empty(&docs));
        let before = handle.load();
        let mut next = Document::empty(&docs);
        next.info.title = "next".into();
        handle.publish(next);
        assert_eq!(before.info.title, docs.title);
        assert_eq!(handle.load().info.title, "next");
    }
}
