//! # Security Providers
//!
//! A [`SecurityProvider`] contributes two things: a scheme entry for the
//! document (`components.securitySchemes`, keyed by [`SecurityProvider::provider`])
//! and a request check run before binding. On success the extracted
//! [`Credentials`] are handed to [`SecurityProvider::callback`], which by
//! default stores them in the request context for the handler.
//!
//! | provider | id | scheme |
//! |---|---|---|
//! | [`Basic`] | `BasicAuth` | `http` / `basic` |
//! | [`Bearer`] | `BearerAuth` | `http` / `bearer`, format `JWT` |
//! | [`ApiKey`] | `ApiKeyAuth` | `http`, in `header` |
//! | [`CookieAuth`] | `CookieAuth` | `apiKey`, in `cookie` |
//! | [`OAuth2`] | `OAuth2Auth` | `oauth2`, authorization code flow |
//! | [`OpenId`] | `OpenIDAuth` | `openIdConnect` |
//!
//! ```rust
//! use tagwire::security::{ApiKey, SecurityProvider};
//!
//! let key = ApiKey::new("X-Api-Key");
//! assert_eq!(key.provider(), "ApiKeyAuth");
//! ```

use crate::binder::{BindRequest, HeaderVec};
use crate::error::AuthError;
use crate::route::RequestContext;
use serde::Serialize;
use std::collections::BTreeMap;

mod api_key;
mod basic;
mod bearer;
mod cookie;
mod oauth2;
mod openid;

pub use api_key::ApiKey;
pub use basic::Basic;
pub use bearer::Bearer;
pub use cookie::CookieAuth;
pub use oauth2::OAuth2;
pub use openid::OpenId;

pub const BASIC_AUTH: &str = "BasicAuth";
pub const BEARER_AUTH: &str = "BearerAuth";
pub const API_KEY_AUTH: &str = "ApiKeyAuth";
pub const COOKIE_AUTH: &str = "CookieAuth";
pub const OAUTH2_AUTH: &str = "OAuth2Auth";
pub const OPENID_AUTH: &str = "OpenIDAuth";

/// Credentials view of a request.
pub struct SecurityRequest<'a> {
    pub headers: &'a HeaderVec,
    pub cookies: &'a HeaderVec,
}

impl<'a> SecurityRequest<'a> {
    pub fn new(request: &'a BindRequest) -> Self {
        SecurityRequest {
            headers: &request.headers,
            cookies: &request.cookies,
        }
    }

    /// Get a header by name (case-insensitive)
    #[inline]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Token from `Authorization: Bearer <token>`.
    pub fn bearer_token(&self) -> Result<&str, AuthError> {
        let header = self
            .get_header("authorization")
            .ok_or_else(|| AuthError::Missing("authorization header is missing".to_string()))?;
        match header.get(..7) {
            Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => {
                let token = header[7..].trim();
                if token.is_empty() {
                    Err(AuthError::Invalid("bearer token is empty".to_string()))
                } else {
                    Ok(token)
                }
            }
            _ => Err(AuthError::Invalid(
                "authorization header is not bearer".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub password: String,
}

/// What a provider extracted from a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Basic(User),
    Token(String),
    ApiKey(String),
    Cookie(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthFlow {
    pub authorization_url: String,
    pub token_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub refresh_url: String,
    pub scopes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthFlows {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<OAuthFlow>,
}

/// One `components.securitySchemes` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityScheme {
    #[serde(rename = "type")]
    pub scheme_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_format: Option<String>,
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flows: Option<OAuthFlows>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_id_connect_url: Option<String>,
}

pub trait SecurityProvider: Send + Sync {
    /// Identity used as the `securitySchemes` key and in requirements.
    fn provider(&self) -> &str;

    fn scheme(&self) -> SecurityScheme;

    fn authorize(&self, request: &SecurityRequest<'_>) -> Result<Credentials, AuthError>;

    /// Runs after a successful [`authorize`](Self::authorize).
    fn callback(&self, ctx: &mut RequestContext, credentials: Credentials) {
        ctx.extensions.insert(credentials);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_bearer_token_extraction() {
        let req = BindRequest::new(Method::GET, "/").header("Authorization", "bearer abc.def");
        assert_eq!(SecurityRequest::new(&req).bearer_token().unwrap(), "abc.def");

        let basic = BindRequest::new(Method::GET, "/").header("Authorization", "Basic Zm9v");
        assert!(matches!(
            SecurityRequest::new(&basic).bearer_token(),
            Err(AuthError::Invalid(_))
        ));

        let none = BindRequest::new(Method::GET, "/");
        assert!(matches!(
            SecurityRequest::new(&none).bearer_token(),
            Err(AuthError::Missing(_))
        ));
    }

    #[test]
    fn test_scheme_serialization_skips_unset() {
        let value = serde_json::to_value(Bearer.scheme()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "http", "scheme": "bearer", "bearerFormat": "JWT"})
        );
    }
}
