//! # API registry
//!
//! [`Api`] owns every registered operation, the descriptor cache, the binder
//! and the published [`Document`]. Descriptors are built when a route is
//! registered, so a bad tag surfaces as a [`ConfigError`] from
//! [`Api::get`]/[`Api::post`]/... rather than on the first request.
//!
//! ```ignore
//! let mut api = Api::new(ApiConfig::default());
//! api.get("/items/:id", Route::new::<GetItem>().summary("Fetch an item"))?;
//!
//! let mut admin = api.group("/admin").tags(["admin"]).security(Bearer);
//! admin.delete("/items/:id", Route::new::<DeleteItem>())?;
//!
//! api.init()?;
//! let doc = api.document();
//! ```

use crate::binder::{BindRequest, Binder};
use crate::config::ApiConfig;
use crate::document::{normalize_path, Document, DocumentHandle, RegisteredRoute, Server};
use crate::error::{AuthError, ConfigError};
use crate::model::{DescriptorCache, ModelDescriptor};
use crate::route::{HandlerResponse, RequestContext, Route};
use crate::security::{SecurityProvider, SecurityRequest};
use http::Method;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

struct Entry {
    method: Method,
    /// Template as registered (`/items/:id`).
    template: String,
    route: Route,
    descriptor: Arc<ModelDescriptor>,
}

/// Registry of operations plus the document built from them.
pub struct Api {
    config: ApiConfig,
    cache: DescriptorCache,
    binder: Binder,
    /// Normalised path -> method -> entry.
    routes: BTreeMap<String, BTreeMap<String, Entry>>,
    document: DocumentHandle,
    subs: Vec<(String, Api)>,
}

impl Api {
    pub fn new(config: ApiConfig) -> Self {
        let cache = DescriptorCache::new(config.binding.unknown_operators);
        let binder = Binder::new(config.binding.clone());
        let document = DocumentHandle::new(Document::empty(&config.docs));
        Api {
            config,
            cache,
            binder,
            routes: BTreeMap::new(),
            document,
            subs: Vec::new(),
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn cache(&self) -> &DescriptorCache {
        &self.cache
    }

    /// Register `route` for `method` at `path`.
    pub fn handle(&mut self, method: Method, path: &str, route: Route) -> Result<(), ConfigError> {
        let normalized = normalize_path(path);
        let method_key = method.as_str().to_ascii_lowercase();
        if self
            .routes
            .get(&normalized)
            .is_some_and(|methods| methods.contains_key(&method_key))
        {
            let err = ConfigError::DuplicateRoute {
                method: method.to_string(),
                path: normalized,
            };
            error!(error = %err, "route registration failed");
            return Err(err);
        }

        let descriptor = match self.cache.descriptor_of(route.model) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                error!(
                    model = route.model.name,
                    method = %method,
                    path,
                    error = %err,
                    "route registration failed"
                );
                return Err(err);
            }
        };

        debug!(method = %method, path, model = route.model.name, "route registered");
        self.routes.entry(normalized).or_default().insert(
            method_key,
            Entry {
                method,
                template: path.to_string(),
                route,
                descriptor,
            },
        );
        Ok(())
    }

    pub fn get(&mut self, path: &str, route: Route) -> Result<(), ConfigError> {
        self.handle(Method::GET, path, route)
    }

    pub fn post(&mut self, path: &str, route: Route) -> Result<(), ConfigError> {
        self.handle(Method::POST, path, route)
    }

    pub fn put(&mut self, path: &str, route: Route) -> Result<(), ConfigError> {
        self.handle(Method::PUT, path, route)
    }

    pub fn patch(&mut self, path: &str, route: Route) -> Result<(), ConfigError> {
        self.handle(Method::PATCH, path, route)
    }

    pub fn delete(&mut self, path: &str, route: Route) -> Result<(), ConfigError> {
        self.handle(Method::DELETE, path, route)
    }

    pub fn head(&mut self, path: &str, route: Route) -> Result<(), ConfigError> {
        self.handle(Method::HEAD, path, route)
    }

    pub fn options(&mut self, path: &str, route: Route) -> Result<(), ConfigError> {
        self.handle(Method::OPTIONS, path, route)
    }

    /// Routes registered through the group get `prefix` prepended plus the
    /// group's tags and security.
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        Group {
            api: self,
            prefix: prefix.trim_end_matches('/').to_string(),
            tags: Vec::new(),
            security: Vec::new(),
        }
    }

    /// Serve `sub` under `prefix`. The sub API keeps its own document, with
    /// `prefix` added to its servers.
    ///
    /// The prefix must name at least one path segment; `/` would shadow
    /// every route of this API.
    pub fn mount(&mut self, prefix: &str, mut sub: Api) -> Result<(), ConfigError> {
        let trimmed = prefix.trim_end_matches('/');
        if trimmed.is_empty() || !trimmed.starts_with('/') {
            error!(prefix, "invalid mount prefix");
            return Err(ConfigError::InvalidMount {
                prefix: prefix.to_string(),
            });
        }
        let prefix = trimmed.to_string();
        if !sub.config.docs.servers.iter().any(|s| s.url == prefix) {
            sub.config.docs.servers.push(Server {
                url: prefix.clone(),
                description: None,
            });
        }
        sub.document.publish(Document::empty(&sub.config.docs));
        self.subs.push((prefix, sub));
        Ok(())
    }

    /// The API mounted at `prefix`.
    pub fn sub(&self, prefix: &str) -> Option<&Api> {
        let prefix = prefix.trim_end_matches('/');
        self.subs.iter().find(|(p, _)| p == prefix).map(|(_, api)| api)
    }

    /// Rebuild and publish this API's document and every mounted one.
    pub fn init(&self) -> Result<(), ConfigError> {
        let registered = self.routes.values().flat_map(|methods| {
            methods.values().map(|entry| RegisteredRoute {
                path: &entry.template,
                method: &entry.method,
                route: &entry.route,
                descriptor: &entry.descriptor,
            })
        });
        let document = Document::assemble(&self.config.docs, registered, &self.cache)?;
        self.document.publish(document);
        for (_, sub) in &self.subs {
            sub.init()?;
        }
        Ok(())
    }

    /// The last published document.
    pub fn document(&self) -> Arc<Document> {
        self.document.load()
    }

    pub fn route_count(&self) -> usize {
        self.routes.values().map(BTreeMap::len).sum()
    }

    /// Run the operation registered for `method` and `template`.
    ///
    /// Security providers are alternatives: the first that authorizes wins.
    /// Without any success the response is 401.
    pub fn invoke(&self, method: &Method, template: &str, request: &BindRequest) -> HandlerResponse {
        for (prefix, sub) in &self.subs {
            if let Some(rest) = template.strip_prefix(prefix.as_str()) {
                if rest.is_empty() || rest.starts_with('/') {
                    let rest = if rest.is_empty() { "/" } else { rest };
                    return sub.invoke(method, rest, request);
                }
            }
        }

        let normalized = normalize_path(template);
        let Some(entry) = self
            .routes
            .get(&normalized)
            .and_then(|methods| methods.get(&method.as_str().to_ascii_lowercase()))
        else {
            debug!(method = %method, path = template, "no route");
            return HandlerResponse::error(404, "Not Found");
        };

        let mut ctx = RequestContext::new(method.clone(), request.path.clone(), template);
        if let Err(err) = authorize(&entry.route.security, request, &mut ctx) {
            warn!(
                request_id = %ctx.request_id,
                route = %ctx.route,
                error = %err,
                "authorization failed"
            );
            return HandlerResponse::error(401, &err.to_string());
        }

        let response = (entry.route.invoker)(&self.binder, &entry.descriptor, request, &ctx);
        info!(
            request_id = %ctx.request_id,
            method = %method,
            route = %ctx.route,
            status = response.status,
            "operation invoked"
        );
        response
    }
}

fn authorize(
    providers: &[Arc<dyn SecurityProvider>],
    request: &BindRequest,
    ctx: &mut RequestContext,
) -> Result<(), AuthError> {
    if providers.is_empty() {
        return Ok(());
    }
    let security_request = SecurityRequest::new(request);
    let mut last = None;
    for provider in providers {
        match provider.authorize(&security_request) {
            Ok(credentials) => {
                provider.callback(ctx, credentials);
                return Ok(());
            }
            Err(err) => {
                debug!(provider = provider.provider(), error = %err, "provider rejected request");
                last = Some(err);
            }
        }
    }
    Err(last.unwrap_or_else(|| AuthError::Missing("no credentials".to_string())))
}

/// Registration scope with a shared path prefix, tags and security.
pub struct Group<'a> {
    api: &'a mut Api,
    prefix: String,
    tags: Vec<String>,
    security: Vec<Arc<dyn SecurityProvider>>,
}

impl<'a> Group<'a> {
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

    /// Nested group; inherits prefix, tags and security.
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        Group {
            prefix: format!("{}{}", self.prefix, prefix.trim_end_matches('/')),
            tags: self.tags.clone(),
            security: self.security.clone(),
            api: &mut *self.api,
        }
    }

    pub fn handle(&mut self, method: Method, path: &str, route: Route) -> Result<(), ConfigError> {
        let mut route = route;
        let mut tags = self.tags.clone();
        tags.extend(route.tags.drain(..).filter(|t| !self.tags.contains(t)));
        route.tags = tags;
        let mut security = self.security.clone();
        security.append(&mut route.security);
        route.security = security;
        let full = format!("{}{}", self.prefix, path);
        self.api.handle(method, &full, route)
    }

    pub fn get(&mut self, path: &str, route: Route) -> Result<(), ConfigError> {
        self.handle(Method::GET, path, route)
    }

    pub fn post(&mut self, path: &str, route: Route) -> Result<(), ConfigError> {
        self.handle(Method::POST, path, route)
    }

    pub fn put(&mut self, path: &str, route: Route) -> Result<(), ConfigError> {
        self.handle(Method::PUT, path, route)
    }

    pub fn patch(&mut self, path: &str, route: Route) -> Result<(), ConfigError> {
        self.handle(Method::PATCH, path, route)
    }

    pub fn delete(&mut self, path: &str, route: Route) -> Result<(), ConfigError> {
        self.handle(Method::DELETE, path, route)
    }

    pub fn head(&mut self, path: &str, route: Route) -> Result<(), ConfigError> {
        self.handle(Method::HEAD, path, route)
    }

    pub fn options(&mut self, path: &str, route: Route) -> Result<(), ConfigError> {
        self.handle(Method::OPTIONS, path, route)
    }
}
