//! # Table Bindings
//!
//! A binding tells the catalog where the schema for an owner kind lives:
//! `(owner_kind, column)` → `(schema_set, schema_path)`. A binding with
//! `column = None` governs the option store itself; a binding with a
//! column governs a JSON column of the owner's own table.
//!
//! Bindings are supplied by configuration sync and swapped the same way
//! as schema sets: readers clone an `Arc` of an immutable map.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// One owner/column → schema location mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableBinding {
    /// Owner kind (or reserved group name) this binding applies to.
    pub owner_kind: String,
    /// Column of the owner's table, `None` for the option store.
    #[serde(default)]
    pub column: Option<String>,
    /// Dotted path of the governing fragment.
    pub schema_path: String,
    /// Schema set holding the fragment.
    pub schema_set: String,
}

impl TableBinding {
    /// Binding for the option store (no column).
    pub fn options(
        owner_kind: impl Into<String>,
        schema_set: impl Into<String>,
        schema_path: impl Into<String>,
    ) -> Self {
        Self {
            owner_kind: owner_kind.into(),
            column: None,
            schema_path: schema_path.into(),
            schema_set: schema_set.into(),
        }
    }

    /// Binding for a JSON column of the owner's table.
    pub fn column(
        owner_kind: impl Into<String>,
        column: impl Into<String>,
        schema_set: impl Into<String>,
        schema_path: impl Into<String>,
    ) -> Self {
        Self {
            owner_kind: owner_kind.into(),
            column: Some(column.into()),
            schema_path: schema_path.into(),
            schema_set: schema_set.into(),
        }
    }

    fn key(&self) -> BindingKey {
        (self.owner_kind.clone(), self.column.clone())
    }
}

type BindingKey = (String, Option<String>);

/// Registry of table bindings keyed by `(owner_kind, column)`.
///
/// Cloning shares the underlying registry.
#[derive(Debug, Clone, Default)]
pub struct BindingRegistry {
    current: Arc<RwLock<Arc<BTreeMap<BindingKey, TableBinding>>>>,
}

impl BindingRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the binding for its `(owner_kind, column)` key,
    /// returning the binding it replaced.
    pub fn upsert_binding(&self, binding: TableBinding) -> Option<TableBinding> {
        let mut guard = self.current.write();
        let mut next = (**guard).clone();
        let previous = next.insert(binding.key(), binding.clone());
        *guard = Arc::new(next);
        drop(guard);

        tracing::info!(
            owner_kind = %binding.owner_kind,
            column = ?binding.column,
            schema_set = %binding.schema_set,
            schema_path = %binding.schema_path,
            replaced = previous.is_some(),
            "table binding upserted"
        );
        previous
    }

    /// Remove every binding, returning how many were removed.
    pub fn remove_all_bindings(&self) -> usize {
        let mut guard = self.current.write();
        let removed = guard.len();
        *guard = Arc::new(BTreeMap::new());
        drop(guard);

        tracing::info!(removed, "table bindings cleared");
        removed
    }

    /// The binding for `(owner_kind, column)`, if any.
    pub fn get(&self, owner_kind: &str, column: Option<&str>) -> Option<TableBinding> {
        let key = (owner_kind.to_string(), column.map(str::to_string));
        self.current.read().get(&key).cloned()
    }

    /// All bindings ordered by owner kind then column.
    pub fn list(&self) -> Vec<TableBinding> {
        self.current.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_then_get() {
        let bindings = BindingRegistry::new();
        assert!(bindings
            .upsert_binding(TableBinding::options("teams", "project", "teams"))
            .is_none());
        let got = bindings.get("teams", None).unwrap();
        assert_eq!(got.schema_path, "teams");
        assert!(bindings.get("teams", Some("settings")).is_none());
    }

    #[test]
    fn upsert_replaces_same_key() {
        let bindings = BindingRegistry::new();
        bindings.upsert_binding(TableBinding::options("teams", "project", "teams"));
        let previous = bindings
            .upsert_binding(TableBinding::options("teams", "billing", "orgs.teams"))
            .unwrap();
        assert_eq!(previous.schema_set, "project");
        assert_eq!(bindings.get("teams", None).unwrap().schema_set, "billing");
        assert_eq!(bindings.list().len(), 1);
    }

    #[test]
    fn column_bindings_are_distinct_keys() {
        let bindings = BindingRegistry::new();
        bindings.upsert_binding(TableBinding::options("teams", "project", "teams"));
        bindings.upsert_binding(TableBinding::column("teams", "settings", "project", "team_settings"));
        assert_eq!(bindings.list().len(), 2);
        assert_eq!(
            bindings.get("teams", Some("settings")).unwrap().schema_path,
            "team_settings"
        );
    }

    #[test]
    fn remove_all_clears() {
        let bindings = BindingRegistry::new();
        bindings.upsert_binding(TableBinding::options("a", "project", "a"));
        bindings.upsert_binding(TableBinding::options("b", "project", "b"));
        assert_eq!(bindings.remove_all_bindings(), 2);
        assert!(bindings.list().is_empty());
    }

    #[test]
    fn wire_format_is_camel_case() {
        let json = serde_json::to_value(TableBinding::options("teams", "project", "teams")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "ownerKind": "teams",
                "column": null,
                "schemaPath": "teams",
                "schemaSet": "project"
            })
        );
    }
}
