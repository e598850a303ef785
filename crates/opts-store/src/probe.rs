//! # Owner-Kind and Reference Probes
//!
//! An option record carries only an opaque owner id. To find which schema
//! group governs it, the store asks each registered owner kind, in
//! registration order, whether the id exists there. The first kind that
//! answers yes wins.
//!
//! **Registration order is part of the contract.** If two kinds could both
//! contain an id, the one registered first always claims it.
//!
//! Reference keys reuse the same machinery: their `meta.tables` list names
//! registered tables (owner kinds or plain reference tables), probed in
//! declaration order for existence only.

use std::collections::HashSet;
use std::sync::Arc;

use opts_core::OwnerId;
use opts_schema::OwnerGroup;
use parking_lot::RwLock;
use thiserror::Error;
use uuid::Uuid;

use crate::error::OptionError;

/// Existence check against one table.
pub trait ExistenceProbe: Send + Sync {
    /// Whether a row with this id exists.
    fn exists(&self, id: Uuid) -> bool;
}

impl<F> ExistenceProbe for F
where
    F: Fn(Uuid) -> bool + Send + Sync,
{
    fn exists(&self, id: Uuid) -> bool {
        self(id)
    }
}

/// In-memory id table.
///
/// Cloning shares the underlying set.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    ids: Arc<RwLock<HashSet<Uuid>>>,
}

impl MemoryTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an id; returns `false` if it was already present.
    pub fn insert(&self, id: Uuid) -> bool {
        self.ids.write().insert(id)
    }

    /// Remove an id; returns `true` if it was present.
    pub fn remove(&self, id: &Uuid) -> bool {
        self.ids.write().remove(id)
    }

    /// Number of ids.
    pub fn len(&self) -> usize {
        self.ids.read().len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExistenceProbe for MemoryTable {
    fn exists(&self, id: Uuid) -> bool {
        self.ids.read().contains(&id)
    }
}

/// Error registering a probe.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The name is one of the reserved wildcard groups.
    #[error("'{0}' is a reserved group name and cannot be registered")]
    ReservedName(String),

    /// A table with this name is already registered.
    #[error("table '{0}' is already registered")]
    Duplicate(String),

    /// The name is empty or contains a dot.
    #[error("invalid table name {0:?}")]
    InvalidName(String),
}

struct RegisteredTable {
    name: String,
    owner_kind: bool,
    probe: Arc<dyn ExistenceProbe>,
}

impl std::fmt::Debug for RegisteredTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTable")
            .field("name", &self.name)
            .field("owner_kind", &self.owner_kind)
            .finish_non_exhaustive()
    }
}

/// Ordered registry of owner kinds and reference tables.
#[derive(Debug, Default)]
pub struct ProbeRegistry {
    tables: Vec<RegisteredTable>,
}

impl ProbeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an owner kind. Owner kinds are probed in the order they
    /// are registered.
    pub fn register_owner_kind(
        &mut self,
        name: &str,
        probe: impl ExistenceProbe + 'static,
    ) -> Result<(), RegistrationError> {
        self.register(name, true, Arc::new(probe))
    }

    /// Register a table that reference keys may point into but that never
    /// owns options.
    pub fn register_table(
        &mut self,
        name: &str,
        probe: impl ExistenceProbe + 'static,
    ) -> Result<(), RegistrationError> {
        self.register(name, false, Arc::new(probe))
    }

    fn register(
        &mut self,
        name: &str,
        owner_kind: bool,
        probe: Arc<dyn ExistenceProbe>,
    ) -> Result<(), RegistrationError> {
        if name.is_empty() || name.contains('.') {
            return Err(RegistrationError::InvalidName(name.to_string()));
        }
        if OwnerGroup::is_reserved(name) {
            return Err(RegistrationError::ReservedName(name.to_string()));
        }
        if self.tables.iter().any(|t| t.name == name) {
            return Err(RegistrationError::Duplicate(name.to_string()));
        }
        self.tables.push(RegisteredTable {
            name: name.to_string(),
            owner_kind,
            probe,
        });
        Ok(())
    }

    /// Owner kinds in probe order.
    pub fn owner_kinds(&self) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|t| t.owner_kind)
            .map(|t| t.name.as_str())
            .collect()
    }

    /// The first owner kind, in registration order, that contains `owner`.
    pub fn resolve_owner_kind(&self, owner: OwnerId) -> Result<&str, OptionError> {
        for table in self.tables.iter().filter(|t| t.owner_kind) {
            if table.probe.exists(owner.0) {
                tracing::debug!(%owner, owner_kind = %table.name, "owner kind resolved");
                return Ok(&table.name);
            }
        }
        Err(OptionError::OwnerNotFound {
            owner_id: owner,
            probed: self.owner_kinds().into_iter().map(str::to_string).collect(),
        })
    }

    /// Whether `id` exists in at least one of `tables`, probed in order.
    /// Names that are not registered are skipped.
    pub fn reference_exists(&self, tables: &[String], id: Uuid) -> bool {
        for name in tables {
            match self.tables.iter().find(|t| &t.name == name) {
                Some(table) => {
                    if table.probe.exists(id) {
                        return true;
                    }
                }
                None => tracing::warn!(table = %name, "reference table is not registered"),
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_registered_kind_wins() {
        let shared = Uuid::new_v4();
        let teams = MemoryTable::new();
        let projects = MemoryTable::new();
        teams.insert(shared);
        projects.insert(shared);

        let mut registry = ProbeRegistry::new();
        registry.register_owner_kind("teams", teams).unwrap();
        registry.register_owner_kind("projects", projects).unwrap();

        assert_eq!(registry.resolve_owner_kind(OwnerId(shared)).unwrap(), "teams");
    }

    #[test]
    fn later_kind_found_when_earlier_misses() {
        let id = Uuid::new_v4();
        let mut registry = ProbeRegistry::new();
        registry.register_owner_kind("teams", |_: Uuid| false).unwrap();
        registry.register_owner_kind("projects", move |x: Uuid| x == id).unwrap();
        assert_eq!(registry.resolve_owner_kind(OwnerId(id)).unwrap(), "projects");
    }

    #[test]
    fn unresolved_owner_names_all_probed_kinds() {
        let mut registry = ProbeRegistry::new();
        registry.register_owner_kind("teams", |_: Uuid| false).unwrap();
        registry.register_table("files", |_: Uuid| true).unwrap();
        registry.register_owner_kind("projects", |_: Uuid| false).unwrap();

        match registry.resolve_owner_kind(OwnerId::new()) {
            Err(OptionError::OwnerNotFound { probed, .. }) => {
                assert_eq!(probed, vec!["teams".to_string(), "projects".to_string()])
            }
            other => panic!("expected OwnerNotFound, got {other:?}"),
        }
    }

    #[test]
    fn plain_tables_never_resolve_owners() {
        let mut registry = ProbeRegistry::new();
        registry.register_table("files", |_: Uuid| true).unwrap();
        assert!(registry.resolve_owner_kind(OwnerId::new()).is_err());
    }

    #[test]
    fn reserved_and_duplicate_names_rejected() {
        let mut registry = ProbeRegistry::new();
        assert_eq!(
            registry.register_owner_kind("any", |_: Uuid| true),
            Err(RegistrationError::ReservedName("any".into()))
        );
        assert_eq!(
            registry.register_owner_kind("global", |_: Uuid| true),
            Err(RegistrationError::ReservedName("global".into()))
        );
        registry.register_owner_kind("teams", |_: Uuid| true).unwrap();
        assert_eq!(
            registry.register_table("teams", |_: Uuid| true),
            Err(RegistrationError::Duplicate("teams".into()))
        );
        assert!(matches!(
            registry.register_table("a.b", |_: Uuid| true),
            Err(RegistrationError::InvalidName(_))
        ));
    }

    #[test]
    fn reference_probe_checks_declared_tables_only() {
        let id = Uuid::new_v4();
        let files = MemoryTable::new();
        files.insert(id);
        let mut registry = ProbeRegistry::new();
        registry.register_table("images", MemoryTable::new()).unwrap();
        registry.register_table("files", files).unwrap();

        assert!(registry.reference_exists(&["images".into(), "files".into()], id));
        assert!(!registry.reference_exists(&["images".into()], id));
        assert!(!registry.reference_exists(&["missing".into()], id));
        assert!(!registry.reference_exists(&[], id));
    }

    #[test]
    fn memory_table_tracks_membership() {
        let table = MemoryTable::new();
        let id = Uuid::new_v4();
        assert!(table.is_empty());
        assert!(table.insert(id));
        assert!(!table.insert(id));
        assert!(table.exists(id));
        assert!(table.remove(&id));
        assert!(!table.exists(id));
    }
}
