use super::{Credentials, SecurityProvider, SecurityRequest, SecurityScheme, User, BASIC_AUTH};
use crate::error::AuthError;
use base64::{engine::general_purpose, Engine as _};
use tracing::debug;

/// HTTP Basic authentication. Yields [`Credentials::Basic`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Basic;

impl Basic {
    fn parse(header: &str) -> Result<User, AuthError> {
        let encoded = match header.get(..6) {
            Some(prefix) if prefix.eq_ignore_ascii_case("basic ") => header[6..].trim(),
            _ => {
                return Err(AuthError::Invalid(
                    "authorization header is not basic".to_string(),
                ))
            }
        };
        let raw = general_purpose::STANDARD.decode(encoded).map_err(|e| {
            debug!("basic credentials are not base64: {:?}", e);
            AuthError::Invalid("malformed basic credentials".to_string())
        })?;
        let text = String::from_utf8(raw)
            .map_err(|_| AuthError::Invalid("malformed basic credentials".to_string()))?;
        let (username, password) = text
            .split_once(':')
            .ok_or_else(|| AuthError::Invalid("malformed basic credentials".to_string()))?;
        Ok(User {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

impl SecurityProvider for Basic {
    fn provider(&self) -> &str {
        BASIC_AUTH
    }

    fn scheme(&self) -> SecurityScheme {
        SecurityScheme {
            scheme_type: "http".to_string(),
            scheme: Some("basic".to_string()),
            ..SecurityScheme::default()
        }
    }

    fn authorize(&self, request: &SecurityRequest<'_>) -> Result<Credentials, AuthError> {
        let header = request
            .get_header("authorization")
            .ok_or_else(|| AuthError::Missing("authorization header is missing".to_string()))?;
        Basic::parse(header).map(Credentials::Basic)
    }
}
