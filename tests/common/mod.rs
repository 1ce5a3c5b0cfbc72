//! Models shared by the integration tests.
#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tagwire::security::Credentials;
use tagwire::{Endpoint, Model, RequestContext, UploadedFile};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Model)]
pub struct TokenHeader {
    #[field(header = "token", validate = "required", json = "token", default = "test")]
    pub token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Model)]
pub struct TestQuery {
    #[serde(flatten)]
    #[field(embed)]
    pub auth: TokenHeader,
    #[field(query = "name", validate = "required", json = "name", description = "name of model")]
    pub name: String,
    #[serde(rename = "enum")]
    #[field(
        query = "enum",
        validate = "required,oneof=1 2",
        json = "enum",
        description = "enum of model",
        default = "1"
    )]
    pub kind: String,
    #[field(query = "optional", json = "optional")]
    pub optional: String,
}

impl Endpoint for TestQuery {
    type Output = TestQuery;

    fn handle(self, _ctx: &RequestContext) -> anyhow::Result<TestQuery> {
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Model)]
pub struct TestQueryPath {
    #[field(uri = "id", validate = "required", json = "id", description = "id of model")]
    pub id: i64,
    #[field(header = "tags", json = "tags")]
    pub tags: Vec<String>,
    #[field(header = "trace", json = "trace")]
    pub trace: String,
}

impl Endpoint for TestQueryPath {
    type Output = TestQueryPath;

    fn handle(self, _ctx: &RequestContext) -> anyhow::Result<TestQueryPath> {
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Model)]
pub struct TestForm {
    #[field(query = "id", validate = "required", json = "id", default = "1")]
    pub id: i64,
    #[field(form = "name", validate = "required", json = "name")]
    pub name: String,
    #[field(form = "list", json = "list", validate = "max=3")]
    pub list: Vec<i64>,
}

impl Endpoint for TestForm {
    type Output = TestForm;

    fn handle(self, _ctx: &RequestContext) -> anyhow::Result<TestForm> {
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, Model)]
pub struct TestFile {
    #[field(form = "file", validate = "required", description = "file upload")]
    pub file: UploadedFile,
}

impl Endpoint for TestFile {
    type Output = Value;

    fn handle(self, _ctx: &RequestContext) -> anyhow::Result<Value> {
        Ok(json!({ "file": self.file.filename, "size": self.file.len() }))
    }
}

#[derive(Debug, Clone, Default, Model)]
pub struct TestNoModel {}

impl Endpoint for TestNoModel {
    type Output = Value;

    fn handle(self, _ctx: &RequestContext) -> anyhow::Result<Value> {
        Ok(Value::Null)
    }
}

/// Echoes the user name stored by the Basic provider.
#[derive(Debug, Clone, Default, Model)]
pub struct WhoAmI {}

impl Endpoint for WhoAmI {
    type Output = Value;

    fn handle(self, ctx: &RequestContext) -> anyhow::Result<Value> {
        match ctx.credentials() {
            Some(Credentials::Basic(user)) => Ok(json!({ "user": user.username })),
            Some(Credentials::Token(token)) => Ok(json!({ "token": token })),
            other => anyhow::bail!("unexpected credentials: {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Default, Model)]
pub struct Failing {}

impl Endpoint for Failing {
    type Output = Value;

    fn handle(self, _ctx: &RequestContext) -> anyhow::Result<Value> {
        anyhow::bail!("database unavailable")
    }
}

#[derive(Debug, Clone, Default, Model)]
pub struct Panicking {}

impl Endpoint for Panicking {
    type Output = Value;

    fn handle(self, _ctx: &RequestContext) -> anyhow::Result<Value> {
        panic!("handler bug")
    }
}

#[derive(Debug, Clone, Default, Model)]
pub struct BadTag {
    #[field(query = "n", validate = "between=1 2")]
    pub n: i64,
}

impl Endpoint for BadTag {
    type Output = Value;

    fn handle(self, _ctx: &RequestContext) -> anyhow::Result<Value> {
        Ok(Value::Null)
    }
}
