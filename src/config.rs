//! # Configuration
//!
//! [`ApiConfig`] groups document metadata, binder behaviour and logging. It
//! can be built in code, read from a YAML, TOML or JSON file, and then
//! overridden from the environment:
//!
//! | variable | field |
//! |---|---|
//! | `TAGWIRE_TITLE` | `docs.title` |
//! | `TAGWIRE_VERSION` | `docs.version` |
//! | `TAGWIRE_UNKNOWN_OPERATORS` | `binding.unknown_operators` (`reject` / `ignore`) |
//! | `TAGWIRE_HEADER_SEPARATOR` | `binding.header_separator` |
//! | `TAGWIRE_LOG_LEVEL` | `log.level` |
//! | `TAGWIRE_LOG_FORMAT` | `log.format` (`json` / `pretty`) |
//!
//! ```yaml
//! docs:
//!   title: Pet Store
//!   version: 1.2.0
//! binding:
//!   unknown_operators: ignore
//! log:
//!   level: debug
//!   format: pretty
//! ```

use crate::constraint::UnknownOperatorPolicy;
use crate::document::{Contact, License, Server};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsConfig {
    pub title: String,
    pub description: Option<String>,
    pub version: String,
    pub terms_of_service: Option<String>,
    pub contact: Option<Contact>,
    pub license: Option<License>,
    pub servers: Vec<Server>,
    pub openapi_version: String,
}

impl Default for DocsConfig {
    fn default() -> Self {
        DocsConfig {
            title: "API".to_string(),
            description: None,
            version: "0.1.0".to_string(),
            terms_of_service: None,
            contact: None,
            license: None,
            servers: Vec::new(),
            openapi_version: "3.0.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindConfig {
    /// Splits header and cookie values bound to repeated fields.
    pub header_separator: String,
    pub unknown_operators: UnknownOperatorPolicy,
}

impl Default for BindConfig {
    fn default() -> Self {
        BindConfig {
            header_separator: ",".to_string(),
            unknown_operators: UnknownOperatorPolicy::Reject,
        }
    }
}

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// trace/debug/info/warn/error
    pub level: String,
    pub format: LogFormat,
    /// Extra `EnvFilter` directives, comma separated.
    pub target_filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".to_string(),
            format: LogFormat::Json,
            target_filter: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub docs: DocsConfig,
    pub binding: BindConfig,
    pub log: LogConfig,
}

impl ApiConfig {
    /// Load from a file; the format follows the extension
    /// (`.yaml`/`.yml`, `.toml`, `.json`).
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let config = match ext.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&text)
                .with_context(|| format!("parsing YAML config {}", path.display()))?,
            "toml" => toml::from_str(&text)
                .with_context(|| format!("parsing TOML config {}", path.display()))?,
            "json" => serde_json::from_str(&text)
                .with_context(|| format!("parsing JSON config {}", path.display()))?,
            other => bail!("unsupported config format `{other}` for {}", path.display()),
        };
        Ok(config)
    }

    /// Apply `TAGWIRE_*` overrides from the process environment.
    pub fn apply_env(self) -> Self {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from any key lookup.
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(title) = lookup("TAGWIRE_TITLE") {
            self.docs.title = title;
        }
        if let Some(version) = lookup("TAGWIRE_VERSION") {
            self.docs.version = version;
        }
        if let Some(policy) = lookup("TAGWIRE_UNKNOWN_OPERATORS") {
            self.binding.unknown_operators = UnknownOperatorPolicy::parse(&policy);
        }
        if let Some(separator) = lookup("TAGWIRE_HEADER_SEPARATOR") {
            if !separator.is_empty() {
                self.binding.header_separator = separator;
            }
        }
        if let Some(level) = lookup("TAGWIRE_LOG_LEVEL") {
            self.log.level = level;
        }
        if let Some(format) = lookup("TAGWIRE_LOG_FORMAT") {
            self.log.format = LogFormat::parse(&format);
        }
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.docs.title = title.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.docs.version = version.into();
        self
    }
}
