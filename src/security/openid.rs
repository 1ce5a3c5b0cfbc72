use super::{Credentials, SecurityProvider, SecurityRequest, SecurityScheme, OPENID_AUTH};
use crate::error::AuthError;

#[derive(Debug, Clone)]
pub struct OpenId {
    pub connect_url: String,
}

impl OpenId {
    pub fn new(connect_url: impl Into<String>) -> Self {
        OpenId {
            connect_url: connect_url.into(),
        }
    }
}

impl SecurityProvider for OpenId {
    fn provider(&self) -> &str {
        OPENID_AUTH
    }

    fn scheme(&self) -> SecurityScheme {
        SecurityScheme {
            scheme_type: "openIdConnect".to_string(),
            open_id_connect_url: Some(self.connect_url.clone()),
            ..SecurityScheme::default()
        }
    }

    fn authorize(&self, request: &SecurityRequest<'_>) -> Result<Credentials, AuthError> {
        request
            .bearer_token()
            .map(|token| Credentials::Token(token.to_string()))
    }
}
