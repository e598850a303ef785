//! # Schema Registry & Path Resolver
//!
//! The registry maps schema set names (e.g. `"project"`) to parsed schema
//! trees. Readers take an `Arc` of the current [`SchemaSnapshot`] and
//! resolve against it without holding any lock; `replace_schema_set`
//! parses the new tree first and then swaps the snapshot pointer under a
//! short write lock. A reader therefore sees either the old tree or the
//! new one, never a mixture.
//!
//! ## Path resolution
//!
//! A schema path is dot-separated. The first segment names a top-level
//! group; each following segment steps into a declared property, except
//! the literal `items` which steps into an array's item schema when no
//! property of that name exists. A missing segment yields `None`, letting
//! the caller fall back to another path.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use opts_core::Timestamp;
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::SchemaError;
use crate::fragment::SchemaFragment;

/// Schema set used when no binding names another one.
pub const DEFAULT_SCHEMA_SET: &str = "project";

/// One registered schema set.
#[derive(Debug, Clone)]
pub struct SchemaEntry {
    name: String,
    content: Value,
    groups: BTreeMap<String, Arc<SchemaFragment>>,
    updated_at: Timestamp,
    version: u64,
}

impl SchemaEntry {
    /// Schema set identifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The tree exactly as supplied to `replace_schema_set`.
    pub fn content(&self) -> &Value {
        &self.content
    }

    /// When this set was last replaced.
    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Number of times this set has been replaced, starting at 1.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Names of the top-level groups.
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.keys().map(String::as_str).collect()
    }

    /// Resolve a dotted path inside this set.
    pub fn lookup(&self, path: &str) -> Option<Arc<SchemaFragment>> {
        let mut segments = path.split('.');
        let first = segments.next().filter(|s| !s.is_empty())?;
        let mut current = Arc::clone(self.groups.get(first)?);
        for segment in segments {
            if segment.is_empty() {
                return None;
            }
            let next = match current.property(segment) {
                Some(child) => Arc::clone(child),
                None if segment == "items" => Arc::clone(current.items()?),
                None => return None,
            };
            current = next;
        }
        Some(current)
    }
}

/// An immutable view of every registered schema set.
#[derive(Debug, Default)]
pub struct SchemaSnapshot {
    entries: HashMap<String, Arc<SchemaEntry>>,
}

impl SchemaSnapshot {
    /// A registered schema set.
    pub fn entry(&self, set: &str) -> Option<&Arc<SchemaEntry>> {
        self.entries.get(set)
    }

    /// Resolve `path` in `set`; `Ok(None)` when the path does not resolve.
    pub fn lookup(&self, set: &str, path: &str) -> Result<Option<Arc<SchemaFragment>>, SchemaError> {
        let entry = self
            .entries
            .get(set)
            .ok_or_else(|| SchemaError::SchemaSetNotFound {
                set: set.to_string(),
            })?;
        Ok(entry.lookup(path))
    }

    /// Resolve `path` in `set`, failing when it does not resolve.
    pub fn resolve(&self, set: &str, path: &str) -> Result<Arc<SchemaFragment>, SchemaError> {
        self.lookup(set, path)?
            .ok_or_else(|| SchemaError::PathNotFound {
                set: set.to_string(),
                path: path.to_string(),
            })
    }

    /// Sorted names of all registered sets.
    pub fn set_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Process-wide schema registry.
///
/// Cloning shares the underlying registry.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    current: Arc<RwLock<Arc<SchemaSnapshot>>>,
}

impl SchemaRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot. Hold it for the duration of one logical
    /// operation so that every resolution inside it sees the same trees.
    pub fn snapshot(&self) -> Arc<SchemaSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Replace schema set `name` wholesale with `tree`.
    ///
    /// `tree` must be a mapping from group names to fragments. Returns the
    /// new version number of the set.
    pub fn replace_schema_set(&self, name: &str, tree: Value) -> Result<u64, SchemaError> {
        if name.is_empty() {
            return Err(SchemaError::InvalidTree {
                set: name.to_string(),
                reason: "schema set name must not be empty".to_string(),
            });
        }
        let Value::Object(raw_groups) = &tree else {
            return Err(SchemaError::InvalidTree {
                set: name.to_string(),
                reason: "top level must be a mapping of groups".to_string(),
            });
        };
        let groups = raw_groups
            .iter()
            .map(|(group, raw)| (group.clone(), Arc::new(SchemaFragment::parse(raw))))
            .collect::<BTreeMap<_, _>>();

        let mut guard = self.current.write();
        let version = guard.entries.get(name).map_or(1, |e| e.version + 1);
        let mut entries = guard.entries.clone();
        entries.insert(
            name.to_string(),
            Arc::new(SchemaEntry {
                name: name.to_string(),
                content: tree,
                groups,
                updated_at: Timestamp::now(),
                version,
            }),
        );
        *guard = Arc::new(SchemaSnapshot { entries });
        drop(guard);

        tracing::info!(schema_set = name, version, "schema set replaced");
        Ok(version)
    }

    /// See [`SchemaSnapshot::lookup`].
    pub fn lookup(&self, set: &str, path: &str) -> Result<Option<Arc<SchemaFragment>>, SchemaError> {
        self.snapshot().lookup(set, path)
    }

    /// See [`SchemaSnapshot::resolve`].
    pub fn resolve(&self, set: &str, path: &str) -> Result<Arc<SchemaFragment>, SchemaError> {
        self.snapshot().resolve(set, path)
    }

    /// A registered schema set.
    pub fn entry(&self, set: &str) -> Option<Arc<SchemaEntry>> {
        self.snapshot().entry(set).cloned()
    }

    /// Sorted names of all registered sets.
    pub fn schema_sets(&self) -> Vec<String> {
        self.snapshot().set_names()
    }
}
