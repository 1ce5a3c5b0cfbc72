use super::{
    Credentials, OAuthFlow, OAuthFlows, SecurityProvider, SecurityRequest, SecurityScheme,
    OAUTH2_AUTH,
};
use crate::error::AuthError;
use std::collections::BTreeMap;

/// OAuth2 authorization code flow. Requests carry the access token as a
/// bearer token.
#[derive(Debug, Clone, Default)]
pub struct OAuth2 {
    pub authorization_url: String,
    pub token_url: String,
    pub refresh_url: String,
    pub scopes: BTreeMap<String, String>,
}

impl OAuth2 {
    pub fn new(authorization_url: impl Into<String>, token_url: impl Into<String>) -> Self {
        OAuth2 {
            authorization_url: authorization_url.into(),
            token_url: token_url.into(),
            ..OAuth2::default()
        }
    }

    pub fn refresh_url(mut self, url: impl Into<String>) -> Self {
        self.refresh_url = url.into();
        self
    }

    pub fn scope(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.scopes.insert(name.into(), description.into());
        self
    }
}

impl SecurityProvider for OAuth2 {
    fn provider(&self) -> &str {
        OAUTH2_AUTH
    }

    fn scheme(&self) -> SecurityScheme {
        SecurityScheme {
            scheme_type: "oauth2".to_string(),
            flows: Some(OAuthFlows {
                authorization_code: Some(OAuthFlow {
                    authorization_url: self.authorization_url.clone(),
                    token_url: self.token_url.clone(),
                    refresh_url: self.refresh_url.clone(),
                    scopes: self.scopes.clone(),
                }),
            }),
            ..SecurityScheme::default()
        }
    }

    fn authorize(&self, request: &SecurityRequest<'_>) -> Result<Credentials, AuthError> {
        request
            .bearer_token()
            .map(|token| Credentials::Token(token.to_string()))
    }
}
