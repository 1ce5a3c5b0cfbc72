//! # Tag Metadata Parser
//!
//! Turns the annotations attached to one model field into a typed
//! [`FieldTags`]. Annotations arrive either as the ordered key/value pairs the
//! `#[derive(Model)]` macro emits or as a Go-style raw struct tag string:
//!
//! ```text
//! query:"name" validate:"required,oneof=1 2" json:"name" default:"1"
//! ```
//!
//! Keys may appear in any order. The recognised vocabulary is `header`,
//! `cookie`, `query`, `uri`, `form`, `json`, `embed`, `validate`, `default`,
//! `example` and `description`; anything else is ignored. A field without any
//! source, naming or embed key does not participate in binding or schemas.

use crate::constraint::{Constraints, UnknownOperatorPolicy};
use crate::error::ConfigError;
use std::fmt;

pub const HEADER: &str = "header";
pub const COOKIE: &str = "cookie";
pub const QUERY: &str = "query";
pub const URI: &str = "uri";
pub const FORM: &str = "form";
pub const JSON: &str = "json";
pub const EMBED: &str = "embed";
pub const VALIDATE: &str = "validate";
pub const DEFAULT: &str = "default";
pub const EXAMPLE: &str = "example";
pub const DESCRIPTION: &str = "description";

/// Annotations as declared on a model field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSource {
    Pairs(&'static [(&'static str, &'static str)]),
    Raw(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    /// The part of the value before the first comma (`name,omitempty` -> `name`).
    pub fn name(&self) -> &str {
        self.value.split(',').next().unwrap_or_default()
    }
}

/// Ordered set of annotations for one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: Vec<Tag>,
}

impl TagSet {
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Result<Self, String> {
        let mut set = TagSet::default();
        for (key, value) in pairs {
            set.push(key, value)?;
        }
        Ok(set)
    }

    /// Parse a raw struct tag string: whitespace separated `key:"value"` items
    /// where values are double quoted with `\"` and `\\` escapes.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut set = TagSet::default();
        let mut chars = raw.chars().peekable();
        loop {
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
            if chars.peek().is_none() {
                break;
            }

            let mut key = String::new();
            while let Some(&c) = chars.peek() {
                if c == ':' || c.is_whitespace() || c == '"' || c.is_control() {
                    break;
                }
                key.push(c);
                chars.next();
            }
            if key.is_empty() {
                return Err(format!("expected a tag key in `{raw}`"));
            }
            if chars.next() != Some(':') {
                return Err(format!("tag key `{key}` must be followed by `:`"));
            }
            if chars.next() != Some('"') {
                return Err(format!("value of `{key}` must be double quoted"));
            }

            let mut value = String::new();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => match chars.next() {
                        Some(escaped) => value.push(escaped),
                        None => return Err(format!("dangling escape in `{key}`")),
                    },
                    '"' => {
                        closed = true;
                        break;
                    }
                    other => value.push(other),
                }
            }
            if !closed {
                return Err(format!("unterminated value for `{key}`"));
            }
            set.push(&key, &value)?;
        }
        Ok(set)
    }

    fn push(&mut self, key: &str, value: &str) -> Result<(), String> {
        if self.get(key).is_some() {
            return Err(format!("tag key `{key}` appears more than once"));
        }
        self.tags.push(Tag {
            key: key.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| t.key.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Transport location a field is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
    Header,
    Cookie,
    Query,
    Path,
    Body,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Header => "header",
            Source::Cookie => "cookie",
            Source::Query => "query",
            Source::Path => "path",
            Source::Body => "body",
        }
    }

    /// The OpenAPI `in` value, `None` for body fields which are never parameters.
    pub fn parameter_in(&self) -> Option<&'static str> {
        match self {
            Source::Body => None,
            other => Some(other.as_str()),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a field is bound from and under which wire name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    pub source: Source,
    pub name: String,
}

/// Model and field names used to label configuration errors.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    pub model: &'a str,
    pub field: &'a str,
}

impl FieldContext<'_> {
    pub fn malformed(&self, reason: impl Into<String>) -> ConfigError {
        ConfigError::MalformedTag {
            model: self.model.to_string(),
            field: self.field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Typed view of one field's annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldTags {
    pub embed: bool,
    pub binding: Option<Binding>,
    pub form: Option<String>,
    pub json: Option<String>,
    pub constraints: Constraints,
    pub default: Option<String>,
    pub example: Option<String>,
    pub description: Option<String>,
}

impl FieldTags {
    pub fn parse(
        source: &TagSource,
        ctx: FieldContext<'_>,
        policy: UnknownOperatorPolicy,
    ) -> Result<Option<FieldTags>, ConfigError> {
        let set = match source {
            TagSource::Pairs(pairs) => TagSet::from_pairs(pairs),
            TagSource::Raw(raw) => TagSet::parse(raw),
        }
        .map_err(|reason| ctx.malformed(reason))?;
        Self::from_tag_set(&set, ctx, policy)
    }

    pub fn from_tag_set(
        set: &TagSet,
        ctx: FieldContext<'_>,
        policy: UnknownOperatorPolicy,
    ) -> Result<Option<FieldTags>, ConfigError> {
        let embed = set.get(EMBED).is_some();

        let mut binding: Option<Binding> = None;
        for (key, source) in [
            (HEADER, Source::Header),
            (COOKIE, Source::Cookie),
            (QUERY, Source::Query),
            (URI, Source::Path),
        ] {
            let Some(tag) = set.get(key) else { continue };
            if let Some(existing) = &binding {
                return Err(ConfigError::ConflictingSources {
                    model: ctx.model.to_string(),
                    field: ctx.field.to_string(),
                    first: existing.source.to_string(),
                    second: source.to_string(),
                });
            }
            let name = tag.name();
            if name.is_empty() {
                return Err(ctx.malformed(format!("`{key}` needs a wire name")));
            }
            binding = Some(Binding {
                source,
                name: name.to_string(),
            });
        }

        let form = naming(set, FORM);
        let json = naming(set, JSON);

        if !embed && binding.is_none() && form.is_none() && json.is_none() {
            return Ok(None);
        }

        if embed {
            binding = None;
        } else if binding.is_none() {
            if let Some(name) = form.as_ref().or(json.as_ref()) {
                binding = Some(Binding {
                    source: Source::Body,
                    name: name.clone(),
                });
            }
        }

        let constraints = match set.get(VALIDATE) {
            Some(tag) if !embed => Constraints::parse(&tag.value, ctx, policy)?,
            _ => Constraints::default(),
        };

        Ok(Some(FieldTags {
            embed,
            binding,
            form,
            json,
            constraints,
            default: set.get(DEFAULT).map(|t| t.value.clone()),
            example: set.get(EXAMPLE).map(|t| t.value.clone()),
            description: set.get(DESCRIPTION).map(|t| t.value.clone()),
        }))
    }
}

fn naming(set: &TagSet, key: &str) -> Option<String> {
    let name = set.get(key)?.name();
    if name.is_empty() || name == "-" {
        None
    } else {
        Some(name.to_string())
    }
}
