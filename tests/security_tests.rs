//! Security providers: credential extraction and the default callback.

use http::Method;
use tagwire::security::{
    ApiKey, Bearer, CookieAuth, Credentials, OAuth2, OpenId, SecurityProvider, SecurityRequest,
};
use tagwire::{AuthError, BindRequest, RequestContext};

fn authorize(provider: &dyn SecurityProvider, request: &BindRequest) -> Result<Credentials, AuthError> {
    provider.authorize(&SecurityRequest::new(request))
}

#[test]
fn test_api_key_header() {
    let provider = ApiKey::new("X-Api-Key");
    let ok = BindRequest::new(Method::GET, "/").header("x-api-key", "secret");
    assert_eq!(
        authorize(&provider, &ok).unwrap(),
        Credentials::ApiKey("secret".to_string())
    );

    let empty = BindRequest::new(Method::GET, "/").header("X-Api-Key", "");
    assert!(matches!(authorize(&provider, &empty), Err(AuthError::Missing(_))));
    let none = BindRequest::new(Method::GET, "/");
    assert!(authorize(&provider, &none).is_err());
}

#[test]
fn test_cookie() {
    let provider = CookieAuth::new("session");
    let ok = BindRequest::new(Method::GET, "/").header("Cookie", "theme=dark; session=s-123");
    assert_eq!(
        authorize(&provider, &ok).unwrap(),
        Credentials::Cookie("s-123".to_string())
    );

    let other = BindRequest::new(Method::GET, "/").cookie("theme", "dark");
    assert!(matches!(authorize(&provider, &other), Err(AuthError::Missing(_))));
}

#[test]
fn test_token_providers_share_bearer_extraction() {
    let providers: Vec<Box<dyn SecurityProvider>> = vec![
        Box::new(Bearer),
        Box::new(OAuth2::new("https://a.example/authorize", "https://a.example/token")),
        Box::new(OpenId::new("https://a.example/.well-known/openid-configuration")),
    ];
    let ok = BindRequest::new(Method::GET, "/").header("Authorization", "Bearer abc");
    let wrong = BindRequest::new(Method::GET, "/").header("Authorization", "Token abc");
    let empty = BindRequest::new(Method::GET, "/").header("Authorization", "Bearer   ");

    for provider in &providers {
        assert_eq!(
            authorize(provider.as_ref(), &ok).unwrap(),
            Credentials::Token("abc".to_string())
        );
        assert!(matches!(authorize(provider.as_ref(), &wrong), Err(AuthError::Invalid(_))));
        assert!(matches!(authorize(provider.as_ref(), &empty), Err(AuthError::Invalid(_))));
    }
}

#[test]
fn test_default_callback_stores_credentials() {
    let mut ctx = RequestContext::new(Method::GET, "/me", "/me");
    assert!(ctx.credentials().is_none());
    Bearer.callback(&mut ctx, Credentials::Token("abc".to_string()));
    assert_eq!(ctx.credentials(), Some(&Credentials::Token("abc".to_string())));
}

#[test]
fn test_scheme_descriptors() {
    let oauth = OAuth2::new("https://a.example/authorize", "https://a.example/token")
        .refresh_url("https://a.example/refresh")
        .scope("write", "write access");
    let value = serde_json::to_value(oauth.scheme()).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "type": "oauth2",
            "flows": {
                "authorizationCode": {
                    "authorizationUrl": "https://a.example/authorize",
                    "tokenUrl": "https://a.example/token",
                    "refreshUrl": "https://a.example/refresh",
                    "scopes": { "write": "write access" }
                }
            }
        })
    );

    let cookie = serde_json::to_value(CookieAuth::new("session").scheme()).unwrap();
    assert_eq!(
        cookie,
        serde_json::json!({ "type": "apiKey", "in": "cookie", "name": "session" })
    );

    let openid = serde_json::to_value(OpenId::new("https://a.example/oidc").scheme()).unwrap();
    assert_eq!(
        openid,
        serde_json::json!({ "type": "openIdConnect", "openIdConnectUrl": "https://a.example/oidc" })
    );
}
