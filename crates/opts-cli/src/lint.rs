//! # Lint Subcommand
//!
//! Lists every keyword the parser would drop, per group. Dropped keywords
//! are accepted silently at load time, so this is the only place they
//! surface.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use opts_schema::{OwnerGroup, SchemaFragment};
use serde_json::Value;

use crate::load_tree;

/// Arguments for `opts lint`.
#[derive(Args, Debug)]
pub struct LintArgs {
    /// Schema tree file (YAML, or JSON with a `.json` extension).
    pub file: PathBuf,

    /// Exit with status 1 when any keyword is dropped.
    #[arg(long)]
    pub strict: bool,
}

/// One dropped keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintNote {
    pub group: String,
    pub note: String,
}

impl std::fmt::Display for LintNote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.group, self.note)
    }
}

/// Lint every top-level group of `tree`, in key order.
pub fn lint_tree(tree: &Value) -> Vec<LintNote> {
    let Some(groups) = tree.as_object() else {
        return Vec::new();
    };
    let mut names: Vec<&String> = groups.keys().collect();
    names.sort();
    names
        .into_iter()
        .flat_map(|group| {
            SchemaFragment::lint(&groups[group])
                .into_iter()
                .map(move |note| LintNote {
                    group: group.clone(),
                    note,
                })
        })
        .collect()
}

/// Execute `opts lint`.
pub fn run_lint(args: &LintArgs) -> Result<u8> {
    let tree = load_tree(&args.file)?;
    let notes = lint_tree(&tree);
    let group_count = tree.as_object().map_or(0, |g| g.len());

    if let Some(groups) = tree.as_object() {
        for name in groups.keys().filter(|n| OwnerGroup::is_reserved(n)) {
            tracing::info!(group = %name, "reserved group present");
        }
    }

    for note in &notes {
        println!("{note}");
    }
    println!(
        "{}: {} group(s), {} dropped keyword(s)",
        args.file.display(),
        group_count,
        notes.len()
    );

    Ok(if args.strict && !notes.is_empty() { 1 } else { 0 })
}
