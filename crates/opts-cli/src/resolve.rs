//! # Resolve Subcommand
//!
//! Prints what a dotted schema path resolves to: its store metadata, rule
//! kinds, and declared properties.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use opts_schema::{SchemaFragment, DEFAULT_SCHEMA_SET};

use crate::load_registry;

/// Arguments for `opts resolve`.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Schema tree file.
    pub file: PathBuf,

    /// Dotted path, starting with the group name (e.g. `teams.region`).
    pub path: String,

    /// Schema set name to load the tree under.
    #[arg(long, default_value = DEFAULT_SCHEMA_SET)]
    pub set: String,
}

/// Human-readable summary of a fragment.
pub fn describe(path: &str, fragment: &SchemaFragment) -> Vec<String> {
    let meta = fragment.meta();
    let mut lines = vec![format!("path:       {path}")];
    lines.push(format!("multiple:   {}", meta.multiple));
    match &meta.tables {
        Some(tables) => lines.push(format!("tables:     {}", tables.join(", "))),
        None => lines.push("tables:     -".to_string()),
    }
    let kinds = fragment.rule_kinds();
    lines.push(format!(
        "rules:      {}",
        if kinds.is_empty() { "(accepts any value)".to_string() } else { kinds.join(", ") }
    ));
    let properties = fragment.property_names();
    if !properties.is_empty() {
        lines.push(format!("properties: {}", properties.join(", ")));
    }
    lines
}

/// Execute `opts resolve`.
pub fn run_resolve(args: &ResolveArgs) -> Result<u8> {
    let registry = load_registry(&args.file, &args.set)?;
    let fragment = registry.resolve(&args.set, &args.path)?;
    for line in describe(&args.path, &fragment) {
        println!("{line}");
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn describes_reference_key() {
        let fragment = SchemaFragment::parse(&json!({
            "type": "string",
            "meta": { "tables": ["files", "images"], "multiple": true }
        }));
        let lines = describe("teams.avatar", &fragment);
        assert_eq!(lines[0], "path:       teams.avatar");
        assert_eq!(lines[1], "multiple:   true");
        assert_eq!(lines[2], "tables:     files, images");
        assert_eq!(lines[3], "rules:      type");
    }

    #[test]
    fn describes_empty_fragment() {
        let lines = describe("any", &SchemaFragment::default());
        assert!(lines.contains(&"rules:      (accepts any value)".to_string()));
        assert_eq!(lines.len(), 4);
    }
}
