use super::{Credentials, SecurityProvider, SecurityRequest, SecurityScheme, BEARER_AUTH};
use crate::error::AuthError;

/// Bearer token authentication. The token is handed over as
/// [`Credentials::Token`]; verifying it is up to the callback or handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bearer;

impl SecurityProvider for Bearer {
    fn provider(&self) -> &str {
        BEARER_AUTH
    }

    fn scheme(&self) -> SecurityScheme {
        SecurityScheme {
            scheme_type: "http".to_string(),
            scheme: Some("bearer".to_string()),
            bearer_format: Some("JWT".to_string()),
            ..SecurityScheme::default()
        }
    }

    fn authorize(&self, request: &SecurityRequest<'_>) -> Result<Credentials, AuthError> {
        request
            .bearer_token()
            .map(|token| Credentials::Token(token.to_string()))
    }
}
