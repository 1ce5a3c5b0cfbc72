//! Error taxonomy.
//!
//! * [`ConfigError`] - the annotated model itself is broken. Raised while
//!   descriptors are built at registration time and fatal for the API.
//! * [`BindError`] - a single request could not be decoded or failed
//!   validation. Recoverable; reported to the client as a 400.
//! * [`AuthError`] - a security provider rejected the request credentials.

use crate::validator::{summarize, ValidationIssue};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("malformed tag on {model}.{field}: {reason}")]
    MalformedTag {
        model: String,
        field: String,
        reason: String,
    },

    #[error("{model}.{field} declares more than one source ({first} and {second})")]
    ConflictingSources {
        model: String,
        field: String,
        first: String,
        second: String,
    },

    #[error("unsupported validation operator `{operator}` on {model}.{field}")]
    UnsupportedOperator {
        model: String,
        field: String,
        operator: String,
    },

    #[error("invalid operand for `{operator}` on {model}.{field}: {reason}")]
    InvalidOperand {
        model: String,
        field: String,
        operator: String,
        reason: String,
    },

    #[error("default `{literal}` on {model}.{field} does not fit the field type: {reason}")]
    InvalidDefault {
        model: String,
        field: String,
        literal: String,
        reason: String,
    },

    #[error("{model}.{field} is marked embed but is not a model")]
    EmbedNotModel { model: String, field: String },

    #[error("cyclic model: {cycle}")]
    CyclicModel { cycle: String },

    #[error("{model}: {source_kind} `{name}` is declared by more than one embedded model at the same depth")]
    AmbiguousField {
        model: String,
        source_kind: String,
        name: String,
    },

    #[error("{model}.{field}: serde names disagree with tag names: {reason}")]
    NameMismatch {
        model: String,
        field: String,
        reason: String,
    },

    #[error("cannot mount an API at `{prefix}`")]
    InvalidMount { prefix: String },

    #[error("route {method} {path} is already registered")]
    DuplicateRoute { method: String, path: String },
}

/// Per-request binding failure. Every variant carries all issues found, never
/// only the first.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    #[error("request could not be decoded: {}", summarize(.0))]
    Decode(Vec<ValidationIssue>),

    #[error("request validation failed: {}", summarize(.0))]
    Validation(Vec<ValidationIssue>),
}

impl BindError {
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            BindError::Decode(issues) | BindError::Validation(issues) => issues,
        }
    }

    /// Wire names of every failing field, in report order, without duplicates.
    pub fn fields(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for issue in self.issues() {
            if !names.contains(&issue.field.as_str()) {
                names.push(issue.field.as_str());
            }
        }
        names
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BindError::Decode(_) => "decode",
            BindError::Validation(_) => "validation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("{0}")]
    Missing(String),

    #[error("{0}")]
    Invalid(String),
}
