//! # Model Descriptor Builder
//!
//! A model is a plain struct with `#[derive(Model)]`. The derive records, for
//! every annotated field, its Rust ident, its annotations and its
//! [`TypeShape`]; this module turns that static declaration into a
//! [`ModelDescriptor`]:
//!
//! - annotations are parsed once ([`crate::tags`]),
//! - embedded models are spliced into the parent in place,
//! - nested models get their own descriptors,
//! - `default` literals are converted to typed values up front,
//! - fields holding nested models must read and write under their tag names.
//!
//! When an embedded model declares the same source and wire name as a
//! shallower field, the shallower one wins and the embedded one is dropped.
//! Two declarations at the same depth are a [`ConfigError::AmbiguousField`].
//!
//! [`ConfigError::AmbiguousField`]: crate::error::ConfigError::AmbiguousField

mod cache;
mod descriptor;
mod shape;
mod wire;

pub use cache::DescriptorCache;
pub use descriptor::{FieldDescriptor, FieldShape, ModelDescriptor};
pub use shape::{zero_value, Binary, Describe, ModelRef, ScalarKind, TypeShape, UploadedFile};
pub use wire::{check_names, contains_model, missing_name, sample_value};

use crate::tags::TagSource;
use serde_json::Value;

/// One annotated field as declared in source.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub ident: &'static str,
    pub tags: TagSource,
    pub shape: TypeShape,
    pub zero: fn() -> Value,
}

/// Implemented by `#[derive(Model)]`.
pub trait Model: Default + Send + 'static {
    fn fields() -> Vec<FieldDecl>;

    /// Store `value` in the field addressed by `path` (Rust idents, through
    /// embeds). `Ok(false)` when no such field exists.
    fn assign(&mut self, path: &[&str], value: Value) -> Result<bool, serde_json::Error>;

    /// Serialized current value of the field addressed by `path`.
    fn read(&self, path: &[&str]) -> Option<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::UnknownOperatorPolicy;
    use crate::error::ConfigError;
    use crate::tags::Source;
    use crate::Model;
    use std::sync::Arc;

    #[derive(Debug, Default, Model)]
    struct TokenHeader {
        #[field(header = "token", validate = "required", json = "token", default = "test")]
        token: String,
    }

    #[derive(Debug, Default, Model)]
    struct TestQuery {
        #[field(embed)]
        auth: TokenHeader,
        #[field(query = "name", validate = "required", json = "name", description = "name of model")]
        name: String,
        #[field(query = "enum", validate = "required,oneof=1 2", json = "enum", default = "1")]
        kind: String,
        #[field(query = "ids", json = "ids", default = "1,2")]
        ids: Vec<u32>,
        unannotated: i32,
    }

    #[derive(Debug, Default, Model)]
    struct Shadowing {
        #[field(embed)]
        auth: TokenHeader,
        #[field(header = "token", json = "token")]
        token: Option<String>,
    }

    #[derive(Debug, Default, Model)]
    struct OtherToken {
        #[field(header = "token")]
        value: String,
    }

    #[derive(Debug, Default, Model)]
    struct Ambiguous {
        #[field(embed)]
        a: TokenHeader,
        #[field(embed)]
        b: OtherToken,
    }

    // The derive refuses `embed` on a non-model at compile time; a hand
    // written declaration can still get it wrong.
    #[derive(Debug, Default)]
    struct BadEmbed {
        count: i32,
    }

    impl Model for BadEmbed {
        fn fields() -> Vec<FieldDecl> {
            vec![FieldDecl {
                ident: "count",
                tags: TagSource::Pairs(&[("embed", "")]),
                shape: <i32 as Describe>::shape(),
                zero: zero_value::<i32>,
            }]
        }

        fn assign(&mut self, _path: &[&str], _value: Value) -> Result<bool, serde_json::Error> {
            Ok(false)
        }

        fn read(&self, _path: &[&str]) -> Option<Value> {
            Some(Value::from(self.count))
        }
    }

    #[derive(Debug, Default, Model)]
    struct BadDefault {
        #[field(query = "n", default = "abc")]
        n: i64,
    }

    #[derive(Debug, Default, serde::Serialize, serde::Deserialize, Model)]
    struct Node {
        #[field(json = "value")]
        value: i32,
        #[field(json = "next")]
        next: Option<Box<Node>>,
    }

    #[derive(Debug, Default, serde::Serialize, serde::Deserialize, Model)]
    struct Address {
        #[field(json = "city", validate = "required")]
        city: String,
    }

    #[derive(Debug, Default, Model)]
    struct Person {
        #[field(json = "address")]
        address: Address,
    }

    #[derive(Debug, Default, serde::Serialize, serde::Deserialize, Model)]
    struct RenamedCity {
        #[field(json = "cityName", validate = "required")]
        city: String,
    }

    #[derive(Debug, Default, Model)]
    struct Resident {
        #[field(json = "address")]
        address: Option<RenamedCity>,
    }

    #[derive(Debug, Default, serde::Serialize, serde::Deserialize, Model)]
    #[serde(default)]
    struct LenientCity {
        #[field(json = "cityName")]
        city: String,
    }

    #[derive(Debug, Default, Model)]
    struct Visitor {
        #[field(json = "addresses")]
        addresses: Vec<LenientCity>,
    }

    #[derive(Debug, Default, serde::Serialize, serde::Deserialize, Model)]
    struct AgreedCity {
        #[serde(rename = "cityName")]
        #[field(json = "cityName", validate = "required")]
        city: String,
    }

    #[derive(Debug, Default, Model)]
    struct Local {
        #[field(json = "address")]
        address: Option<AgreedCity>,
    }

    fn build<T: Model>() -> Result<ModelDescriptor, ConfigError> {
        ModelDescriptor::build::<T>(UnknownOperatorPolicy::Reject)
    }

    #[test]
    fn test_embed_is_flattened() {
        let d = build::<TestQuery>().unwrap();
        let idents: Vec<_> = d.fields.iter().map(|f| f.ident).collect();
        assert_eq!(idents, vec!["token", "name", "kind", "ids"]);
        let token = d.field("token").unwrap();
        assert_eq!(token.path, vec!["auth", "token"]);
        assert_eq!(token.depth, 1);
        assert_eq!(token.source(), Some(Source::Header));
        assert_eq!(token.default, Some(Value::from("test")));
    }

    #[test]
    fn test_defaults_are_typed() {
        let d = build::<TestQuery>().unwrap();
        assert_eq!(
            d.field("ids").unwrap().default,
            Some(serde_json::json!([1, 2]))
        );
        assert_eq!(d.field("kind").unwrap().zero, Value::from(""));
    }

    #[test]
    fn test_build_is_deterministic() {
        assert_eq!(build::<TestQuery>().unwrap(), build::<TestQuery>().unwrap());
    }

    #[test]
    fn test_shallow_declaration_shadows_embedded() {
        let d = build::<Shadowing>().unwrap();
        assert_eq!(d.fields.len(), 1);
        assert_eq!(d.fields[0].path, vec!["token"]);
    }

    #[test]
    fn test_same_depth_duplicates_are_ambiguous() {
        assert!(matches!(
            build::<Ambiguous>().unwrap_err(),
            ConfigError::AmbiguousField { .. }
        ));
    }

    #[test]
    fn test_embed_requires_model() {
        assert!(matches!(
            build::<BadEmbed>().unwrap_err(),
            ConfigError::EmbedNotModel { .. }
        ));
    }

    #[test]
    fn test_bad_default_is_config_error() {
        assert!(matches!(
            build::<BadDefault>().unwrap_err(),
            ConfigError::InvalidDefault { .. }
        ));
    }

    #[test]
    fn test_cycles_are_rejected() {
        match build::<Node>().unwrap_err() {
            ConfigError::CyclicModel { cycle } => assert_eq!(cycle, "Node -> Node"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_nested_models_carry_descriptors() {
        let d = build::<Person>().unwrap();
        let FieldShape::Model(inner) = &d.fields[0].shape else {
            panic!("expected nested model");
        };
        assert_eq!(inner.name, "Address");
        assert!(inner.fields[0].is_required());
    }

    #[test]
    fn test_nested_model_must_decode_under_tag_names() {
        match build::<Resident>().unwrap_err() {
            ConfigError::NameMismatch { model, field, reason } => {
                assert_eq!(model, "Resident");
                assert_eq!(field, "address");
                assert!(reason.contains("city"), "{reason}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_nested_model_must_encode_under_tag_names() {
        match build::<Visitor>().unwrap_err() {
            ConfigError::NameMismatch { field, reason, .. } => {
                assert_eq!(field, "addresses");
                assert_eq!(reason, "LenientCity.city is not read or written as `cityName`");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_renamed_nested_model_is_accepted() {
        let d = build::<Local>().unwrap();
        let FieldShape::Optional(inner) = &d.fields[0].shape else {
            panic!("expected optional");
        };
        assert!(matches!(inner.as_ref(), FieldShape::Model(m) if m.name == "AgreedCity"));
    }

    #[test]
    fn test_cache_shares_descriptors() {
        let cache = DescriptorCache::default();
        let a = cache.descriptor::<TestQuery>().unwrap();
        let b = cache.descriptor::<TestQuery>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_assign_and_read_through_embed() {
        let mut q = TestQuery::default();
        assert!(q.assign(&["auth", "token"], Value::from("abc")).unwrap());
        assert_eq!(q.read(&["auth", "token"]), Some(Value::from("abc")));
        assert!(!q.assign(&["missing"], Value::Null).unwrap());
        assert!(q.assign(&["name"], Value::from(5)).is_err());
        assert_eq!(q.unannotated, 0);
    }
}
