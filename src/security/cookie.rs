use super::{Credentials, SecurityProvider, SecurityRequest, SecurityScheme, COOKIE_AUTH};
use crate::error::AuthError;

/// Session value carried in a named cookie.
#[derive(Debug, Clone)]
pub struct CookieAuth {
    pub name: String,
}

impl CookieAuth {
    pub fn new(name: impl Into<String>) -> Self {
        CookieAuth { name: name.into() }
    }
}

impl SecurityProvider for CookieAuth {
    fn provider(&self) -> &str {
        COOKIE_AUTH
    }

    fn scheme(&self) -> SecurityScheme {
        SecurityScheme {
            scheme_type: "apiKey".to_string(),
            location: Some("cookie".to_string()),
            name: Some(self.name.clone()),
            ..SecurityScheme::default()
        }
    }

    fn authorize(&self, request: &SecurityRequest<'_>) -> Result<Credentials, AuthError> {
        match request.get_cookie(&self.name) {
            Some(value) if !value.is_empty() => Ok(Credentials::Cookie(value.to_string())),
            _ => Err(AuthError::Missing(format!("empty cookie: {}", self.name))),
        }
    }
}
