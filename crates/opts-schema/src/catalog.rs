//! # Schema Catalog
//!
//! Combines the [`SchemaRegistry`] and [`BindingRegistry`] to answer the
//! question the option store asks on every write: which fragment governs
//! key `K` for owner group `G`?
//!
//! A group's location comes from its `(group, None)` binding when one
//! exists, otherwise from the default schema set with the group name as
//! the path.

use std::sync::Arc;

use serde_json::Value;

use crate::binding::BindingRegistry;
use crate::error::SchemaError;
use crate::fragment::SchemaFragment;
use crate::group::OwnerGroup;
use crate::registry::{SchemaRegistry, SchemaSnapshot, DEFAULT_SCHEMA_SET};
use crate::validate::{validate, Violations};

/// Where a group's key declarations live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupLocation {
    /// Schema set name.
    pub schema_set: String,
    /// Dotted path of the group fragment inside the set.
    pub schema_path: String,
}

/// Registry plus bindings plus the default schema set.
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    registry: SchemaRegistry,
    bindings: BindingRegistry,
    default_set: String,
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEMA_SET)
    }
}

impl SchemaCatalog {
    /// An empty catalog using `default_set` for unbound groups.
    pub fn new(default_set: impl Into<String>) -> Self {
        Self {
            registry: SchemaRegistry::new(),
            bindings: BindingRegistry::new(),
            default_set: default_set.into(),
        }
    }

    /// The schema registry.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// The binding registry.
    pub fn bindings(&self) -> &BindingRegistry {
        &self.bindings
    }

    /// Schema set used for unbound groups.
    pub fn default_set(&self) -> &str {
        &self.default_set
    }

    /// Where `group`'s keys are declared.
    pub fn group_location(&self, group: &OwnerGroup) -> GroupLocation {
        match self.bindings.get(group.name(), None) {
            Some(binding) => GroupLocation {
                schema_set: binding.schema_set,
                schema_path: binding.schema_path,
            },
            None => GroupLocation {
                schema_set: self.default_set.clone(),
                schema_path: group.name().to_string(),
            },
        }
    }

    /// The fragment declaring `key` under `group`, resolved against one
    /// snapshot. `Ok(None)` when the group or key is not declared; an error
    /// only when the group's schema set is missing altogether.
    pub fn key_fragment_in(
        &self,
        snapshot: &SchemaSnapshot,
        group: &OwnerGroup,
        key: &str,
    ) -> Result<Option<Arc<SchemaFragment>>, SchemaError> {
        let location = self.group_location(group);
        let group_fragment = snapshot.lookup(&location.schema_set, &location.schema_path)?;
        Ok(group_fragment.and_then(|g| g.property(key).cloned()))
    }

    /// [`Self::key_fragment_in`] against the current snapshot.
    pub fn key_fragment(
        &self,
        group: &OwnerGroup,
        key: &str,
    ) -> Result<Option<Arc<SchemaFragment>>, SchemaError> {
        self.key_fragment_in(&self.registry.snapshot(), group, key)
    }

    /// Validate a JSON column of an owner table against its bound fragment.
    pub fn validate_column(
        &self,
        owner_kind: &str,
        column: &str,
        value: &Value,
    ) -> Result<Violations, SchemaError> {
        let binding = self
            .bindings
            .get(owner_kind, Some(column))
            .ok_or_else(|| SchemaError::BindingNotFound {
                owner_kind: owner_kind.to_string(),
                column: Some(column.to_string()),
            })?;
        let fragment = self
            .registry
            .resolve(&binding.schema_set, &binding.schema_path)?;
        Ok(validate(value, &fragment))
    }
}
