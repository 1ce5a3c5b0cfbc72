//! OpenAPI document assembly: parameters, bodies, responses, security
//! schemes and serialization.

mod common;

use common::*;
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tagwire::document::{Contact, License, Server};
use tagwire::security::{ApiKey, Basic, Bearer, CookieAuth, OAuth2, OpenId};
use tagwire::{Api, ApiConfig, ConfigError, Endpoint, Model, RequestContext, ResponseSpec, Route};

#[derive(Debug, Default, Model)]
struct Preferences {
    #[field(cookie = "session", validate = "required", description = "session id")]
    session: String,
    #[field(cookie = "langs", validate = "max=3")]
    langs: Vec<String>,
}

impl Endpoint for Preferences {
    type Output = Value;

    fn handle(self, _ctx: &RequestContext) -> anyhow::Result<Value> {
        Ok(json!({ "session": self.session }))
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Model)]
#[serde(default)]
struct Profile {
    #[field(json = "displayName")]
    display_name: String,
}

fn build(register: impl FnOnce(&mut Api)) -> Api {
    let mut api = Api::new(ApiConfig::default());
    register(&mut api);
    api.init().unwrap();
    api
}

fn doc_json(api: &Api) -> serde_json::Value {
    api.document().to_value().unwrap()
}

#[test]
fn test_query_parameters() {
    let api = build(|api| {
        api.get("/query", Route::new::<TestQuery>().summary("Test query")).unwrap();
    });
    let doc = doc_json(&api);
    let op = &doc["paths"]["/query"]["get"];
    assert_eq!(op["summary"], "Test query");

    let params = op["parameters"].as_array().unwrap();
    let names: Vec<&str> = params.iter().map(|p| p["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["token", "name", "enum", "optional"]);

    let token = &params[0];
    assert_eq!(token["in"], "header");
    assert_eq!(token["required"], true);
    assert_eq!(token["schema"]["default"], "test");

    let kind = &params[2];
    assert_eq!(kind["in"], "query");
    assert_eq!(kind["required"], true);
    assert_eq!(kind["description"], "enum of model");
    assert_eq!(kind["schema"]["type"], "string");
    assert_eq!(kind["schema"]["enum"], json!(["1", "2"]));
    assert_eq!(kind["schema"]["default"], "1");
    assert!(kind["schema"].get("description").is_none());

    assert!(params[3].get("required").is_none());
    assert!(op.get("requestBody").is_none());
}

#[test]
fn test_cookie_parameters() {
    let api = build(|api| {
        api.get("/prefs", Route::new::<Preferences>()).unwrap();
    });
    let doc = doc_json(&api);
    let params = doc["paths"]["/prefs"]["get"]["parameters"].as_array().unwrap();
    assert_eq!(
        params[0],
        json!({
            "name": "session",
            "in": "cookie",
            "description": "session id",
            "required": true,
            "schema": { "type": "string" }
        })
    );
    assert_eq!(params[1]["in"], "cookie");
    assert_eq!(params[1]["schema"]["maxItems"], 3);
    assert!(params[1].get("required").is_none());
}

#[test]
fn test_paths_are_normalised_and_path_params_required() {
    let api = build(|api| {
        api.get("/items/:id", Route::new::<TestQueryPath>()).unwrap();
    });
    let doc = doc_json(&api);
    assert!(doc["paths"].get("/items/:id").is_none());
    let params = doc["paths"]["/items/{id}"]["get"]["parameters"].as_array().unwrap();
    assert_eq!(params[0]["name"], "id");
    assert_eq!(params[0]["in"], "path");
    assert_eq!(params[0]["required"], true);
    assert_eq!(params[0]["description"], "id of model");
    assert_eq!(params[0]["schema"], json!({ "type": "integer", "format": "int64" }));
    assert_eq!(params[1]["schema"]["type"], "array");
    assert_eq!(params[1]["schema"]["items"]["type"], "string");
}

#[test]
fn test_request_body_only_for_post_and_put() {
    let api = build(|api| {
        api.post(
            "/form",
            Route::new::<TestForm>().request_content_type("application/x-www-form-urlencoded"),
        )
        .unwrap();
        api.put("/form", Route::new::<TestForm>()).unwrap();
        api.patch("/form", Route::new::<TestForm>()).unwrap();
        api.get("/form", Route::new::<TestForm>()).unwrap();
    });
    let doc = doc_json(&api);
    let path = &doc["paths"]["/form"];

    let post = &path["post"]["requestBody"];
    assert_eq!(post["required"], true);
    let schema = &post["content"]["application/x-www-form-urlencoded"]["schema"];
    assert_eq!(schema["type"], "object");
    let props: Vec<&String> = schema["properties"].as_object().unwrap().keys().collect();
    assert_eq!(props, vec!["list", "name"]);
    assert_eq!(schema["required"], json!(["name"]));
    assert_eq!(schema["properties"]["list"]["maxItems"], 3);

    assert!(path["put"]["requestBody"]["content"]["application/json"].is_object());
    assert!(path["patch"].get("requestBody").is_none());
    assert!(path["get"].get("requestBody").is_none());

    // `id` stays a query parameter even on POST.
    assert_eq!(path["post"]["parameters"][0]["name"], "id");
}

#[test]
fn test_file_field_schema() {
    let api = build(|api| {
        api.post(
            "/file",
            Route::new::<TestFile>().request_content_type("multipart/form-data"),
        )
        .unwrap();
    });
    let doc = doc_json(&api);
    let schema = &doc["paths"]["/file"]["post"]["requestBody"]["content"]["multipart/form-data"]["schema"];
    assert_eq!(
        schema["properties"]["file"],
        json!({ "type": "string", "format": "binary", "description": "file upload" })
    );
    assert_eq!(schema["required"], json!(["file"]));
}

#[test]
fn test_responses() {
    let api = build(|api| {
        api.get(
            "/query",
            Route::new::<TestQuery>()
                .response("200", ResponseSpec::of::<Vec<TestQuery>>("all of them"))
                .response("404", ResponseSpec::empty("not found"))
                .response_content_type("application/vnd.api+json"),
        )
        .unwrap();
    });
    let doc = doc_json(&api);
    let responses = &doc["paths"]["/query"]["get"]["responses"];

    let ok = &responses["200"];
    assert_eq!(ok["description"], "all of them");
    let schema = &ok["content"]["application/vnd.api+json"]["schema"];
    assert_eq!(schema["type"], "array");
    let item = &schema["items"];
    assert_eq!(item["type"], "object");
    let mut props: Vec<&String> = item["properties"].as_object().unwrap().keys().collect();
    props.sort();
    assert_eq!(props, vec!["enum", "name", "optional", "token"]);
    assert_eq!(item["properties"]["enum"]["enum"], json!(["1", "2"]));

    assert_eq!(responses["404"], json!({ "description": "not found" }));
}

#[test]
fn test_response_model_must_write_json_names() {
    let mut api = Api::new(ApiConfig::default());
    api.get(
        "/profile",
        Route::new::<TestNoModel>().response("200", ResponseSpec::of::<Profile>("profile")),
    )
    .unwrap();
    match api.init().unwrap_err() {
        ConfigError::NameMismatch { field, reason, .. } => {
            assert_eq!(field, "response 200");
            assert_eq!(reason, "Profile.display_name is not read or written as `displayName`");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_security_schemes_registered_once() {
    let api = build(|api| {
        api.get("/a", Route::new::<TestNoModel>().security(Basic)).unwrap();
        api.get("/b", Route::new::<TestNoModel>().security(Basic).security(Bearer))
            .unwrap();
        api.get("/c", Route::new::<TestNoModel>().security(ApiKey::new("X-Api-Key")))
            .unwrap();
        api.get("/d", Route::new::<TestNoModel>().security(CookieAuth::new("session")))
            .unwrap();
        api.get(
            "/e",
            Route::new::<TestNoModel>().security(
                OAuth2::new("https://auth.example.com/authorize", "https://auth.example.com/token")
                    .scope("read", "read access"),
            ),
        )
        .unwrap();
        api.get(
            "/f",
            Route::new::<TestNoModel>()
                .security(OpenId::new("https://auth.example.com/.well-known/openid-configuration")),
        )
        .unwrap();
    });
    let doc = doc_json(&api);
    let schemes = doc["components"]["securitySchemes"].as_object().unwrap();
    assert_eq!(schemes.len(), 6);

    assert_eq!(schemes["BasicAuth"], json!({ "type": "http", "scheme": "basic" }));
    assert_eq!(
        schemes["BearerAuth"],
        json!({ "type": "http", "scheme": "bearer", "bearerFormat": "JWT" })
    );
    assert_eq!(
        schemes["ApiKeyAuth"],
        json!({ "type": "http", "in": "header", "name": "X-Api-Key" })
    );
    assert_eq!(
        schemes["OAuth2Auth"]["flows"]["authorizationCode"]["scopes"],
        json!({ "read": "read access" })
    );
    assert_eq!(schemes["OpenIDAuth"]["type"], "openIdConnect");

    assert_eq!(
        doc["paths"]["/b"]["get"]["security"],
        json!([{ "BasicAuth": [] }, { "BearerAuth": [] }])
    );
    assert!(doc["paths"]["/a"]["get"]["security"].is_array());
}

#[test]
fn test_excluded_routes_are_served_but_undocumented() {
    let api = build(|api| {
        api.get("/hidden", Route::new::<TestNoModel>().exclude()).unwrap();
        api.get("/shown", Route::new::<TestNoModel>().deprecated().operation_id("shown"))
            .unwrap();
    });
    let doc = api.document();
    assert!(doc.operation_at("/hidden", &Method::GET).is_none());
    let shown = doc.operation_at("/shown", &Method::GET).unwrap();
    assert!(shown.deprecated);
    assert_eq!(shown.operation_id.as_deref(), Some("shown"));

    let request = tagwire::BindRequest::new(Method::GET, "/hidden");
    assert_eq!(api.invoke(&Method::GET, "/hidden", &request).status, 200);
}

#[test]
fn test_info_and_servers() {
    let mut config = ApiConfig::default();
    config.docs.title = "Pet Store".into();
    config.docs.description = Some("Swagger + router".into());
    config.docs.version = "0.1.0".into();
    config.docs.terms_of_service = Some("https://example.com/tos".into());
    config.docs.contact = Some(Contact {
        name: Some("team".into()),
        url: None,
        email: Some("team@example.com".into()),
    });
    config.docs.license = Some(License {
        name: "Apache License 2.0".into(),
        url: None,
    });
    config.docs.servers = vec![Server {
        url: "https://api.example.com".into(),
        description: None,
    }];
    let api = Api::new(config);
    api.init().unwrap();

    let doc = doc_json(&api);
    assert_eq!(doc["openapi"], "3.0.0");
    assert_eq!(
        doc["info"],
        json!({
            "title": "Pet Store",
            "description": "Swagger + router",
            "termsOfService": "https://example.com/tos",
            "contact": { "name": "team", "email": "team@example.com" },
            "license": { "name": "Apache License 2.0" },
            "version": "0.1.0"
        })
    );
    assert_eq!(doc["servers"], json!([{ "url": "https://api.example.com" }]));
}

#[test]
fn test_serializations() {
    let api = build(|api| {
        api.get("/query", Route::new::<TestQuery>()).unwrap();
        api.post("/form", Route::new::<TestForm>()).unwrap();
    });
    let doc = api.document();

    let yaml = doc.to_yaml().unwrap();
    assert!(yaml.contains("openapi: 3.0.0"));
    assert!(yaml.contains("/query:"));

    let text = doc.to_json().unwrap();
    let reparsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(reparsed, doc.to_value().unwrap());

    let spec = doc.to_openapi_spec().unwrap();
    assert_eq!(spec.info.title, doc.info.title);
    assert!(spec.paths.unwrap_or_default().contains_key("/query"));
}
