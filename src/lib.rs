//! # tagwire
//!
//! **tagwire** turns annotated request models into two things at once: a
//! request binder that decodes, defaults and validates incoming data, and an
//! [OpenAPI 3.0](https://spec.openapis.org/oas/v3.0.3) document describing the
//! same operations. Both are driven by the same per-field tags, so the
//! documentation cannot drift from what the binder enforces.
//!
//! ## Architecture
//!
//! - **[`tags`]** - parses per-field tag sets (`header`, `query`, `path`,
//!   `cookie`, `form`, `json`, `validate`, `default`, `example`, `description`)
//! - **[`constraint`]** - validation expressions and their schema keywords
//! - **[`model`]** - `#[derive(Model)]` declarations flattened into cached
//!   descriptors
//! - **[`binder`]** - populates a model from a [`BindRequest`]
//! - **[`schema`]** - JSON Schema synthesis for fields and models
//! - **[`document`]** - OpenAPI document assembly and publication
//! - **[`security`]** - authorization providers and their scheme descriptors
//! - **[`route`]** / **[`api`]** - operations, groups and the registry
//! - **[`config`]** / **[`telemetry`]** - configuration files and logging
//!
//! ## Quick start
//!
//! ```ignore
//! use tagwire::{Api, ApiConfig, Endpoint, Model, RequestContext, Route};
//!
//! #[derive(Default, Model)]
//! struct ListItems {
//!     #[field(query = "limit", validate = "min=1,max=100", default = "20")]
//!     limit: u32,
//!     #[field(header = "X-Token", validate = "required")]
//!     token: String,
//! }
//!
//! impl Endpoint for ListItems {
//!     type Output = Vec<String>;
//!
//!     fn handle(self, _ctx: &RequestContext) -> anyhow::Result<Vec<String>> {
//!         Ok(vec![format!("{} items", self.limit)])
//!     }
//! }
//!
//! let mut api = Api::new(ApiConfig::default());
//! api.get("/items", Route::new::<ListItems>().summary("List items"))?;
//! api.init()?;
//! println!("{}", api.document().to_json()?);
//! ```

// Lets the derive's `::tagwire::` paths resolve inside this crate too.
extern crate self as tagwire;

pub mod api;
pub mod binder;
pub mod config;
pub mod constraint;
pub mod document;
pub mod error;
pub mod model;
pub mod route;
pub mod schema;
pub mod security;
pub mod tags;
pub mod telemetry;
pub mod validator;

pub use api::{Api, Group};
pub use binder::{BindRequest, Binder, MultipartPart};
pub use config::{ApiConfig, BindConfig, DocsConfig, LogConfig, LogFormat};
pub use document::{normalize_path, Document};
pub use error::{AuthError, BindError, ConfigError};
pub use model::{Binary, Describe, Model, ModelDescriptor, UploadedFile};
pub use route::{Endpoint, HandlerResponse, RequestContext, ResponseSpec, Route};
pub use tagwire_macros::Model;
pub use validator::ValidationIssue;

#[doc(hidden)]
pub mod __private {
    pub use serde_json::{from_value, to_value, Error as JsonError, Value};
}
