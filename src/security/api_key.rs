use super::{Credentials, SecurityProvider, SecurityRequest, SecurityScheme, API_KEY_AUTH};
use crate::error::AuthError;

/// Key carried in a named request header.
#[derive(Debug, Clone)]
pub struct ApiKey {
    pub name: String,
}

impl ApiKey {
    pub fn new(name: impl Into<String>) -> Self {
        ApiKey { name: name.into() }
    }
}

impl SecurityProvider for ApiKey {
    fn provider(&self) -> &str {
        API_KEY_AUTH
    }

    // `type` is `http`, not `apiKey`.
    fn scheme(&self) -> SecurityScheme {
        SecurityScheme {
            scheme_type: "http".to_string(),
            location: Some("header".to_string()),
            name: Some(self.name.clone()),
            ..SecurityScheme::default()
        }
    }

    fn authorize(&self, request: &SecurityRequest<'_>) -> Result<Credentials, AuthError> {
        match request.get_header(&self.name) {
            Some(key) if !key.is_empty() => Ok(Credentials::ApiKey(key.to_string())),
            _ => Err(AuthError::Missing("empty apikey".to_string())),
        }
    }
}
