//! Print the OpenAPI document of the bundled demo API.
//!
//! ```text
//! tagwire-openapi --format yaml
//! tagwire-openapi --config api.toml --output openapi.json
//! tagwire-openapi --mount /sub
//! ```

use anyhow::{anyhow, Context};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use tagwire::document::{Contact, License};
use tagwire::security::{Basic, Bearer, Credentials};
use tagwire::{
    telemetry, Api, ApiConfig, Document, Endpoint, Model, RequestContext, ResponseSpec, Route,
    UploadedFile,
};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

#[derive(Parser)]
#[command(name = "tagwire-openapi")]
#[command(about = "Print the OpenAPI document of the tagwire demo API", long_about = None)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// API configuration file (YAML, TOML or JSON)
    #[arg(short, long, env = "TAGWIRE_CONFIG")]
    config: Option<PathBuf>,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the document of the API mounted at this prefix
    #[arg(long)]
    mount: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Model)]
struct TokenHeader {
    #[field(header = "token", validate = "required", json = "token", default = "test")]
    token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Model)]
struct TestQuery {
    #[serde(flatten)]
    #[field(embed)]
    auth: TokenHeader,
    #[field(
        query = "name",
        validate = "required",
        json = "name",
        description = "name of model",
        default = "test"
    )]
    name: String,
    #[serde(rename = "enum")]
    #[field(
        query = "enum",
        validate = "required,oneof=1 2",
        json = "enum",
        description = "enum of model",
        default = "1"
    )]
    kind: String,
    #[field(query = "optional", json = "optional")]
    optional: String,
}

impl Endpoint for TestQuery {
    type Output = TestQuery;

    fn handle(self, ctx: &RequestContext) -> anyhow::Result<TestQuery> {
        if let Some(Credentials::Basic(user)) = ctx.credentials() {
            info!(user = %user.username, "query called");
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Model)]
struct TestQueryList {
    #[serde(flatten)]
    #[field(embed)]
    auth: TokenHeader,
    #[field(
        query = "name",
        validate = "required",
        json = "name",
        description = "name of model",
        default = "test"
    )]
    name: String,
}

impl Endpoint for TestQueryList {
    type Output = Vec<TestQueryList>;

    fn handle(self, _ctx: &RequestContext) -> anyhow::Result<Vec<TestQueryList>> {
        Ok(vec![self])
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Model)]
struct TestQueryPath {
    #[field(
        query = "name",
        validate = "required",
        json = "name",
        description = "name of model",
        default = "test"
    )]
    name: String,
    #[field(
        uri = "id",
        validate = "required",
        json = "id",
        description = "id of model",
        default = "1"
    )]
    id: i64,
    #[field(header = "token", validate = "required", json = "token", default = "test")]
    token: String,
}

impl Endpoint for TestQueryPath {
    type Output = TestQueryPath;

    fn handle(self, _ctx: &RequestContext) -> anyhow::Result<TestQueryPath> {
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Model)]
struct TestForm {
    #[field(
        query = "id",
        validate = "required",
        json = "id",
        description = "id of model",
        default = "1"
    )]
    id: i64,
    #[field(
        form = "name",
        validate = "required",
        json = "name",
        description = "name of model",
        default = "test"
    )]
    name: String,
    #[field(form = "list", validate = "required", json = "list", description = "list of model")]
    list: Vec<i64>,
    #[serde(rename = "enum")]
    #[field(
        form = "enum",
        validate = "required,oneof=1 2",
        json = "enum",
        description = "enum of model",
        default = "1"
    )]
    kind: String,
}

impl Endpoint for TestForm {
    type Output = TestForm;

    fn handle(self, _ctx: &RequestContext) -> anyhow::Result<TestForm> {
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Model)]
struct TestJson {
    #[field(json = "name", validate = "required", description = "name of model", example = "tagwire")]
    name: String,
    #[field(json = "list", validate = "min=1", description = "list of model")]
    list: Vec<i64>,
}

impl Endpoint for TestJson {
    type Output = TestJson;

    fn handle(self, _ctx: &RequestContext) -> anyhow::Result<TestJson> {
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, Model)]
struct TestNoModel {}

impl Endpoint for TestNoModel {
    type Output = Value;

    fn handle(self, _ctx: &RequestContext) -> anyhow::Result<Value> {
        Ok(Value::Null)
    }
}

#[derive(Debug, Clone, Default, Model)]
struct TestFile {
    #[field(form = "file", validate = "required", description = "file upload")]
    file: UploadedFile,
}

impl Endpoint for TestFile {
    type Output = Value;

    fn handle(self, _ctx: &RequestContext) -> anyhow::Result<Value> {
        Ok(json!({ "file": self.file.filename }))
    }
}

fn demo_config() -> ApiConfig {
    let mut config = ApiConfig::default();
    config.docs.title = "tagwire".to_string();
    config.docs.description = Some("Annotated models in, OpenAPI out".to_string());
    config.docs.terms_of_service = Some("https://example.com/terms".to_string());
    config.docs.contact = Some(Contact {
        name: Some("tagwire".to_string()),
        url: Some("https://example.com/tagwire".to_string()),
        email: None,
    });
    config.docs.license = Some(License {
        name: "Apache License 2.0".to_string(),
        url: Some("https://www.apache.org/licenses/LICENSE-2.0".to_string()),
    });
    config
}

fn no_model() -> Route {
    Route::new::<TestNoModel>()
        .summary("Test no model")
        .description("Test no model")
        .response("200", ResponseSpec::empty("success"))
}

fn build_api(config: ApiConfig) -> anyhow::Result<Api> {
    let mut sub = Api::new(config.clone());
    sub.get("/noModel", no_model())?;

    let mut api = Api::new(config);
    api.mount("/sub", sub)?;

    let mut query = api.group("/query").tags(["Query"]);
    query.get(
        "/list",
        Route::new::<TestQueryList>()
            .summary("Test query list")
            .description("Test query list model")
            .security(Basic)
            .response("200", ResponseSpec::of::<Vec<TestQueryList>>("success")),
    )?;
    query.get(
        "/:id",
        Route::new::<TestQueryPath>()
            .summary("Test query path")
            .description("Test query path model")
            .response("200", ResponseSpec::of::<TestQueryPath>("success")),
    )?;
    query.delete(
        "",
        Route::new::<TestQuery>()
            .summary("Test query")
            .description("Test query model")
            .security(Basic)
            .response("200", ResponseSpec::of::<TestQuery>("response model description")),
    )?;

    api.get("/noModel", no_model())?;

    let mut body = api.group("/body").tags(["Body"]).security(Bearer);
    body.post(
        "/encoded",
        Route::new::<TestForm>()
            .summary("Test form")
            .request_content_type("application/x-www-form-urlencoded"),
    )?;
    body.post(
        "/file",
        Route::new::<TestFile>()
            .summary("Test file upload")
            .request_content_type("multipart/form-data"),
    )?;
    body.post(
        "/json",
        Route::new::<TestJson>()
            .summary("Test json body")
            .response("200", ResponseSpec::of::<TestJson>("success")),
    )?;

    api.init()?;
    Ok(api)
}

fn render(document: &Document, format: Format) -> anyhow::Result<String> {
    match format {
        Format::Json => document.to_json(),
        Format::Yaml => document.to_yaml(),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ApiConfig::from_file(path)?,
        None => demo_config(),
    }
    .apply_env();
    telemetry::init_logging(&config.log)?;

    let api = build_api(config)?;
    let document = match &cli.mount {
        Some(prefix) => api
            .sub(prefix)
            .ok_or_else(|| anyhow!("nothing is mounted at `{prefix}`"))?
            .document(),
        None => api.document(),
    };
    let rendered = render(&document, cli.format)?;

    match &cli.output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("writing document to {}", path.display()))?,
        None => println!("{rendered}"),
    }
    Ok(())
}
