//! Operations: one model type plus the documentation options around it.

use crate::binder::{BindRequest, Binder, HeaderVec};
use crate::model::{Describe, Model, ModelDescriptor, ModelRef, TypeShape};
use crate::security::{Credentials, SecurityProvider};
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

/// Per-request state shared between security callbacks and the handler.
#[derive(Debug)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub method: Method,
    /// Concrete request path.
    pub path: String,
    /// Route template the request matched (`/items/:id`).
    pub route: String,
    pub extensions: http::Extensions,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>, route: impl Into<String>) -> Self {
        RequestContext {
            request_id: Uuid::new_v4(),
            method,
            path: path.into(),
            route: route.into(),
            extensions: http::Extensions::new(),
        }
    }

    /// Credentials stored by the default security callback.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.extensions.get::<Credentials>()
    }
}

/// A bound request model that knows how to serve itself.
pub trait Endpoint: Model {
    type Output: Serialize;

    fn handle(self, ctx: &RequestContext) -> anyhow::Result<Self::Output>;
}

/// Result of running an operation.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerResponse {
    pub status: u16,
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        HandlerResponse {
            status,
            headers,
            body,
        }
    }

    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        HandlerResponse::json(status, json!({ "error": message }))
    }

    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Decode then re-encode through `T`, as a handler's output would be.
pub type Roundtrip = fn(Value) -> Result<Value, String>;

fn roundtrip<T: Serialize + DeserializeOwned>(value: Value) -> Result<Value, String> {
    let typed: T = serde_json::from_value(value).map_err(|e| e.to_string())?;
    serde_json::to_value(typed).map_err(|e| e.to_string())
}

/// One documented response.
#[derive(Debug, Clone)]
pub struct ResponseSpec {
    pub description: String,
    pub shape: Option<TypeShape>,
    /// Used at document assembly to check the body is written under the
    /// documented `json` names.
    pub roundtrip: Option<Roundtrip>,
}

impl ResponseSpec {
    pub fn of<T: Describe + Serialize + DeserializeOwned>(description: impl Into<String>) -> Self {
        ResponseSpec {
            description: description.into(),
            shape: Some(T::shape()),
            roundtrip: Some(roundtrip::<T> as Roundtrip),
        }
    }

    pub fn empty(description: impl Into<String>) -> Self {
        ResponseSpec {
            description: description.into(),
            shape: None,
            roundtrip: None,
        }
    }
}

type Invoker =
    Arc<dyn Fn(&Binder, &ModelDescriptor, &BindRequest, &RequestContext) -> HandlerResponse + Send + Sync>;

/// An operation: the request model plus its documentation options.
#[derive(Clone)]
pub struct Route {
    pub(crate) model: ModelRef,
    pub(crate) invoker: Invoker,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub operation_id: Option<String>,
    pub deprecated: bool,
    /// Served but left out of the document.
    pub exclude: bool,
    pub tags: Vec<String>,
    pub security: Vec<Arc<dyn SecurityProvider>>,
    /// Keyed by status code (`"200"`, `"default"`).
    pub responses: BTreeMap<String, ResponseSpec>,
    pub request_content_type: Option<String>,
    pub response_content_type: Option<String>,
}

impl Route {
    pub fn new<E: Endpoint>() -> Self {
        Route {
            model: ModelRef::of::<E>(),
            invoker: Arc::new(invoke::<E>),
            summary: None,
            description: None,
            operation_id: None,
            deprecated: false,
            exclude: false,
            tags: Vec::new(),
            security: Vec::new(),
            responses: BTreeMap::new(),
            request_content_type: None,
            response_content_type: None,
        }
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation_id = Some(id.into());
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    pub fn exclude(mut self) -> Self {
        self.exclude = true;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn security(mut self, provider: impl SecurityProvider + 'static) -> Self {
        self.security.push(Arc::new(provider));
        self
    }

    pub fn shared_security(mut self, provider: Arc<dyn SecurityProvider>) -> Self {
        self.security.push(provider);
        self
    }

    pub fn response(mut self, status: impl Into<String>, spec: ResponseSpec) -> Self {
        self.responses.insert(status.into(), spec);
        self
    }

    pub fn request_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.request_content_type = Some(content_type.into());
        self
    }

    pub fn response_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.response_content_type = Some(content_type.into());
        self
    }

    pub fn model_name(&self) -> &'static str {
        self.model.name
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("model", &self.model.name)
            .field("summary", &self.summary)
            .field("operation_id", &self.operation_id)
            .field("tags", &self.tags)
            .field(
                "security",
                &self.security.iter().map(|s| s.provider().to_string()).collect::<Vec<_>>(),
            )
            .field("exclude", &self.exclude)
            .finish()
    }
}

/// Bind `E`, run it and map every outcome to a response.
fn invoke<E: Endpoint>(
    binder: &Binder,
    descriptor: &ModelDescriptor,
    request: &BindRequest,
    ctx: &RequestContext,
) -> HandlerResponse {
    let endpoint: E = match binder.bind(descriptor, request) {
        Ok(endpoint) => endpoint,
        Err(err) => {
            return HandlerResponse::json(
                400,
                json!({
                    "error": err.to_string(),
                    "kind": err.kind(),
                    "issues": err.issues(),
                }),
            )
        }
    };

    match catch_unwind(AssertUnwindSafe(|| endpoint.handle(ctx))) {
        Ok(Ok(output)) => match serde_json::to_value(output) {
            Ok(body) => HandlerResponse::json(200, body),
            Err(e) => {
                error!(model = descriptor.name, error = %e, "response serialization failed");
                HandlerResponse::error(500, "Failed to serialize response")
            }
        },
        Ok(Err(e)) => {
            error!(model = descriptor.name, route = %ctx.route, error = %e, "handler failed");
            HandlerResponse::error(500, &e.to_string())
        }
        Err(panic) => {
            error!(model = descriptor.name, route = %ctx.route, "handler panicked: {:?}", panic);
            HandlerResponse::error(500, "Handler panicked")
        }
    }
}
