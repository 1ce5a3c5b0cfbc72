use super::shape::{ModelRef, ScalarKind, TypeShape};
use super::wire::{check_names, contains_model};
use crate::binder::decode::decode_literal;
use crate::constraint::{Constraints, UnknownOperatorPolicy};
use crate::error::ConfigError;
use crate::schema::Usage;
use crate::tags::{Binding, FieldContext, FieldTags, Source};
use serde_json::Value;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolved shape of a field: nested models carry their own descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldShape {
    Scalar(ScalarKind),
    Optional(Box<FieldShape>),
    Sequence(Box<FieldShape>),
    Model(Arc<ModelDescriptor>),
    Map,
}

impl FieldShape {
    /// True for repeated fields, looking through `Option`.
    pub fn is_sequence(&self) -> bool {
        match self {
            FieldShape::Sequence(_) => true,
            FieldShape::Optional(inner) => inner.is_sequence(),
            _ => false,
        }
    }

    /// The shape with any `Option` wrappers removed.
    pub fn required_shape(&self) -> &FieldShape {
        match self {
            FieldShape::Optional(inner) => inner.required_shape(),
            other => other,
        }
    }
}

/// Everything known about one participating field after tag parsing and
/// embed flattening.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub ident: &'static str,
    /// Rust field idents from the root model down to this field, crossing
    /// embedded models.
    pub path: Vec<&'static str>,
    /// Number of embeds crossed to reach this field.
    pub depth: usize,
    pub binding: Option<Binding>,
    pub form: Option<String>,
    pub json: Option<String>,
    pub constraints: Constraints,
    pub default: Option<Value>,
    pub example: Option<Value>,
    pub description: Option<String>,
    pub shape: FieldShape,
    pub zero: Value,
}

impl FieldDescriptor {
    pub fn source(&self) -> Option<Source> {
        self.binding.as_ref().map(|b| b.source)
    }

    /// Property name in request schemas: `form`, else `json`.
    pub fn request_name(&self) -> Option<&str> {
        self.form.as_deref().or(self.json.as_deref())
    }

    /// Property name in response schemas: `json` only.
    pub fn response_name(&self) -> Option<&str> {
        self.json.as_deref()
    }

    pub fn is_required(&self) -> bool {
        self.constraints.is_required()
    }
}

/// Flattened, validated view of a model type.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescriptor {
    pub name: &'static str,
    pub type_id: TypeId,
    pub fields: Vec<FieldDescriptor>,
}

impl ModelDescriptor {
    /// Build without a cache. Nested models are built recursively.
    pub fn build<T: super::Model>(policy: UnknownOperatorPolicy) -> Result<Self, ConfigError> {
        Builder::new(policy).build(ModelRef::of::<T>())
    }

    pub fn field(&self, ident: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.ident == ident)
    }

    pub fn fields_from(&self, source: Source) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields
            .iter()
            .filter(move |f| f.source() == Some(source))
    }

    pub fn has_body_fields(&self) -> bool {
        self.fields_from(Source::Body).next().is_some()
    }
}

pub(crate) struct Builder {
    policy: UnknownOperatorPolicy,
    stack: Vec<ModelRef>,
}

impl Builder {
    pub(crate) fn new(policy: UnknownOperatorPolicy) -> Self {
        Builder {
            policy,
            stack: Vec::new(),
        }
    }

    pub(crate) fn build(&mut self, model: ModelRef) -> Result<ModelDescriptor, ConfigError> {
        self.enter(model)?;
        let collected = self.collect(model, model, &[], 0);
        self.stack.pop();
        let fields = resolve_shadowing(model.name, collected?)?;
        Ok(ModelDescriptor {
            name: model.name,
            type_id: model.type_id,
            fields,
        })
    }

    fn enter(&mut self, model: ModelRef) -> Result<(), ConfigError> {
        if let Some(pos) = self.stack.iter().position(|m| m.type_id == model.type_id) {
            let mut cycle: Vec<&str> = self.stack[pos..].iter().map(|m| m.name).collect();
            cycle.push(model.name);
            return Err(ConfigError::CyclicModel {
                cycle: cycle.join(" -> "),
            });
        }
        self.stack.push(model);
        Ok(())
    }

    /// Walk `model`'s declarations, splicing embedded models in place.
    fn collect(
        &mut self,
        root: ModelRef,
        model: ModelRef,
        prefix: &[&'static str],
        depth: usize,
    ) -> Result<Vec<FieldDescriptor>, ConfigError> {
        let mut out = Vec::new();
        for decl in (model.fields)() {
            let ctx = FieldContext {
                model: model.name,
                field: decl.ident,
            };
            let Some(tags) = FieldTags::parse(&decl.tags, ctx, self.policy)? else {
                continue;
            };
            let mut path = prefix.to_vec();
            path.push(decl.ident);

            if tags.embed {
                let TypeShape::Model(inner) = decl.shape else {
                    return Err(ConfigError::EmbedNotModel {
                        model: model.name.to_string(),
                        field: decl.ident.to_string(),
                    });
                };
                self.enter(inner)?;
                let nested = self.collect(root, inner, &path, depth + 1);
                self.stack.pop();
                out.extend(nested?);
                continue;
            }

            let shape = self.resolve(&decl.shape)?;
            if contains_model(&shape) {
                check_names(&shape, Usage::Request, &[Usage::Request, Usage::Response], |sample| {
                    root.probe(&path, sample)
                })
                .map_err(|reason| ConfigError::NameMismatch {
                    model: model.name.to_string(),
                    field: decl.ident.to_string(),
                    reason,
                })?;
            }
            let default = match &tags.default {
                Some(literal) => {
                    let invalid = |reason: String| ConfigError::InvalidDefault {
                        model: model.name.to_string(),
                        field: decl.ident.to_string(),
                        literal: literal.clone(),
                        reason,
                    };
                    let value = decode_literal(literal, &shape).map_err(invalid)?;
                    root.probe(&path, value.clone()).map_err(invalid)?;
                    Some(value)
                }
                None => None,
            };
            let example = tags.example.as_ref().map(|literal| {
                decode_literal(literal, &shape).unwrap_or_else(|_| Value::String(literal.clone()))
            });

            out.push(FieldDescriptor {
                ident: decl.ident,
                path,
                depth,
                binding: tags.binding,
                form: tags.form,
                json: tags.json,
                constraints: tags.constraints,
                default,
                example,
                description: tags.description,
                shape,
                zero: (decl.zero)(),
            });
        }
        Ok(out)
    }

    fn resolve(&mut self, shape: &TypeShape) -> Result<FieldShape, ConfigError> {
        Ok(match shape {
            TypeShape::Scalar(kind) => FieldShape::Scalar(*kind),
            TypeShape::Optional(inner) => FieldShape::Optional(Box::new(self.resolve(inner)?)),
            TypeShape::Sequence(inner) => FieldShape::Sequence(Box::new(self.resolve(inner)?)),
            TypeShape::Map => FieldShape::Map,
            TypeShape::Model(model) => FieldShape::Model(Arc::new(self.build(*model)?)),
        })
    }
}

/// Drop declarations shadowed by a shallower one with the same binding key.
fn resolve_shadowing(
    model: &str,
    fields: Vec<FieldDescriptor>,
) -> Result<Vec<FieldDescriptor>, ConfigError> {
    let mut shallowest: HashMap<&Binding, (usize, usize)> = HashMap::new();
    for field in &fields {
        let Some(binding) = &field.binding else { continue };
        let entry = shallowest.entry(binding).or_insert((field.depth, 0));
        if field.depth < entry.0 {
            *entry = (field.depth, 1);
        } else if field.depth == entry.0 {
            entry.1 += 1;
        }
    }
    if let Some((binding, _)) = shallowest.iter().find(|(_, (_, count))| *count > 1) {
        return Err(ConfigError::AmbiguousField {
            model: model.to_string(),
            source_kind: binding.source.to_string(),
            name: binding.name.clone(),
        });
    }
    let keep: Vec<bool> = fields
        .iter()
        .map(|f| match &f.binding {
            Some(b) => shallowest.get(b).is_some_and(|(depth, _)| *depth == f.depth),
            None => true,
        })
        .collect();
    Ok(fields
        .into_iter()
        .zip(keep)
        .filter_map(|(f, keep)| keep.then_some(f))
        .collect())
}
