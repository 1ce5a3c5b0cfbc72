use super::descriptor::{Builder, FieldShape, ModelDescriptor};
use super::shape::{ModelRef, TypeShape};
use super::Model;
use crate::constraint::UnknownOperatorPolicy;
use crate::error::ConfigError;
use dashmap::DashMap;
use std::any::TypeId;
use std::sync::Arc;

/// Process-lifetime descriptor cache keyed by model type.
///
/// Built descriptors are immutable and shared through `Arc`; lookups after
/// the first build never block each other.
pub struct DescriptorCache {
    policy: UnknownOperatorPolicy,
    entries: DashMap<TypeId, Arc<ModelDescriptor>>,
}

impl DescriptorCache {
    pub fn new(policy: UnknownOperatorPolicy) -> Self {
        DescriptorCache {
            policy,
            entries: DashMap::new(),
        }
    }

    pub fn policy(&self) -> UnknownOperatorPolicy {
        self.policy
    }

    pub fn descriptor<T: Model>(&self) -> Result<Arc<ModelDescriptor>, ConfigError> {
        self.descriptor_of(ModelRef::of::<T>())
    }

    pub fn descriptor_of(&self, model: ModelRef) -> Result<Arc<ModelDescriptor>, ConfigError> {
        if let Some(hit) = self.entries.get(&model.type_id) {
            return Ok(Arc::clone(hit.value()));
        }
        // Built outside the map lock; a concurrent build of the same type
        // produces an identical descriptor and the first insert wins.
        let built = Arc::new(Builder::new(self.policy).build(model)?);
        tracing::debug!(
            model = model.name,
            fields = built.fields.len(),
            "model descriptor built"
        );
        Ok(Arc::clone(
            self.entries.entry(model.type_id).or_insert(built).value(),
        ))
    }

    /// Resolve a declared type, building descriptors for any models in it.
    pub fn resolve(&self, shape: &TypeShape) -> Result<FieldShape, ConfigError> {
        Ok(match shape {
            TypeShape::Scalar(kind) => FieldShape::Scalar(*kind),
            TypeShape::Optional(inner) => FieldShape::Optional(Box::new(self.resolve(inner)?)),
            TypeShape::Sequence(inner) => FieldShape::Sequence(Box::new(self.resolve(inner)?)),
            TypeShape::Map => FieldShape::Map,
            TypeShape::Model(model) => FieldShape::Model(self.descriptor_of(*model)?),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DescriptorCache {
    fn default() -> Self {
        DescriptorCache::new(UnknownOperatorPolicy::default())
    }
}
