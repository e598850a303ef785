//! # opts-cli — Schema Tree Tooling
//!
//! Offline checks for the schema trees the configuration sync feeds into
//! the registry. Every subcommand loads a YAML or JSON tree from disk into
//! a fresh [`SchemaRegistry`] so it sees exactly what the store would.
//!
//! ```bash
//! opts lint schemas/project.yaml
//! opts resolve schemas/project.yaml teams.region
//! opts validate schemas/project.yaml teams.seats '4'
//! ```
//!
//! Handlers return a process exit code; argument parsing lives in
//! `main.rs`.

pub mod lint;
pub mod resolve;
pub mod validate;

use std::path::Path;

use anyhow::{bail, Context, Result};
use opts_schema::SchemaRegistry;
use serde_json::Value;

/// Read a schema tree. `.json` files parse as JSON, anything else as YAML.
pub fn load_tree(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema tree: {}", path.display()))?;
    let tree: Value = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&text)
            .with_context(|| format!("invalid JSON in {}", path.display()))?,
        _ => serde_yaml::from_str(&text)
            .with_context(|| format!("invalid YAML in {}", path.display()))?,
    };
    if !tree.is_object() {
        bail!(
            "{}: schema tree must be a mapping of group names to fragments",
            path.display()
        );
    }
    Ok(tree)
}

/// Load `path` as schema set `set` into a new registry.
pub fn load_registry(path: &Path, set: &str) -> Result<SchemaRegistry> {
    let tree = load_tree(path)?;
    let registry = SchemaRegistry::new();
    registry
        .replace_schema_set(set, tree)
        .with_context(|| format!("failed to load {} as schema set '{set}'", path.display()))?;
    Ok(registry)
}
