use super::{FieldDecl, Model};
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Primitive kinds a field can carry. Each maps to one fixed schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Int,
    Int32,
    Int64,
    Uint,
    Uint32,
    Uint64,
    Float,
    Bool,
    String,
    DateTime,
    Uuid,
    Bytes,
    File,
}

impl ScalarKind {
    pub fn is_unsigned(&self) -> bool {
        matches!(self, ScalarKind::Uint | ScalarKind::Uint32 | ScalarKind::Uint64)
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ScalarKind::Int
                | ScalarKind::Int32
                | ScalarKind::Int64
                | ScalarKind::Uint
                | ScalarKind::Uint32
                | ScalarKind::Uint64
        )
    }
}

/// Handle to a model type that can be walked without an instance.
#[derive(Clone, Copy)]
pub struct ModelRef {
    pub type_id: TypeId,
    pub name: &'static str,
    pub fields: fn() -> Vec<FieldDecl>,
    probe: fn(&[&str], Value) -> Result<Value, String>,
}

impl ModelRef {
    pub fn of<T: Model>() -> Self {
        ModelRef {
            type_id: TypeId::of::<T>(),
            name: short_type_name(std::any::type_name::<T>()),
            fields: T::fields,
            probe: probe::<T>,
        }
    }

    /// Store `value` at `path` on a fresh instance and return the field as
    /// serde writes it back.
    pub fn probe(&self, path: &[&str], value: Value) -> Result<Value, String> {
        (self.probe)(path, value)
    }
}

fn probe<T: Model>(path: &[&str], value: Value) -> Result<Value, String> {
    let mut instance = T::default();
    match instance.assign(path, value) {
        Ok(true) => instance
            .read(path)
            .ok_or_else(|| format!("`{}` could not be read back", path.join("."))),
        Ok(false) => Err(format!("no field at `{}`", path.join("."))),
        Err(e) => Err(e.to_string()),
    }
}

impl fmt::Debug for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelRef").field(&self.name).finish()
    }
}

impl PartialEq for ModelRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

/// `crate::api::GetItem<T>` -> `GetItem<T>`
fn short_type_name(full: &'static str) -> &'static str {
    let end = full.find('<').unwrap_or(full.len());
    match full[..end].rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

/// Static structure of a Rust type as far as binding and schemas care.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeShape {
    Scalar(ScalarKind),
    Optional(Box<TypeShape>),
    Sequence(Box<TypeShape>),
    Model(ModelRef),
    Map,
}

/// Maps a Rust type onto a [`TypeShape`]. Implemented for the supported
/// scalars and containers here and for every `#[derive(Model)]` type.
pub trait Describe {
    fn shape() -> TypeShape;
}

macro_rules! describe_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Describe for $ty {
                fn shape() -> TypeShape {
                    TypeShape::Scalar(ScalarKind::$kind)
                }
            }
        )*
    };
}

describe_scalar! {
    i8 => Int,
    i16 => Int,
    isize => Int,
    i32 => Int32,
    i64 => Int64,
    u8 => Uint,
    u16 => Uint,
    usize => Uint,
    u32 => Uint32,
    u64 => Uint64,
    f32 => Float,
    f64 => Float,
    bool => Bool,
    String => String,
    chrono::DateTime<chrono::Utc> => DateTime,
    uuid::Uuid => Uuid,
    Binary => Bytes,
    UploadedFile => File,
}

impl<T: Describe> Describe for Option<T> {
    fn shape() -> TypeShape {
        TypeShape::Optional(Box::new(T::shape()))
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn shape() -> TypeShape {
        TypeShape::Sequence(Box::new(T::shape()))
    }
}

impl<T: Describe> Describe for Box<T> {
    fn shape() -> TypeShape {
        T::shape()
    }
}

impl<K, V, S> Describe for HashMap<K, V, S> {
    fn shape() -> TypeShape {
        TypeShape::Map
    }
}

impl<K, V> Describe for BTreeMap<K, V> {
    fn shape() -> TypeShape {
        TypeShape::Map
    }
}

impl Describe for Value {
    fn shape() -> TypeShape {
        TypeShape::Map
    }
}

/// The serialized form of `T::default()`, used for `required` checks and for
/// deciding whether a default applies.
pub fn zero_value<T: Default + Serialize>() -> Value {
    serde_json::to_value(T::default()).unwrap_or(Value::Null)
}

/// Raw bytes, carried as standard base64 on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Binary(pub Vec<u8>);

impl Serialize for Binary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Binary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map(Binary)
            .map_err(serde::de::Error::custom)
    }
}

/// A file part of a multipart body, already extracted by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Binary,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, content_type: Option<String>, data: Vec<u8>) -> Self {
        UploadedFile {
            filename: filename.into(),
            content_type,
            data: Binary(data),
        }
    }

    pub fn len(&self) -> usize {
        self.data.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.0.is_empty()
    }
}
