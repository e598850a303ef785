//! # Validate Subcommand
//!
//! Runs the rule interpreter on a JSON value against a resolved path and
//! prints every violation. Exit status 1 means the value is invalid.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use opts_schema::{validate, DEFAULT_SCHEMA_SET};
use serde_json::Value;

use crate::load_registry;

/// Arguments for `opts validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Schema tree file.
    pub file: PathBuf,

    /// Dotted path of the fragment to validate against.
    pub path: String,

    /// The value, as JSON (quote strings: '"eu"').
    pub value: String,

    /// Schema set name to load the tree under.
    #[arg(long, default_value = DEFAULT_SCHEMA_SET)]
    pub set: String,
}

/// Execute `opts validate`.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let value: Value = serde_json::from_str(&args.value)
        .with_context(|| format!("value is not valid JSON: {}", args.value))?;
    let registry = load_registry(&args.file, &args.set)?;
    let fragment = registry.resolve(&args.set, &args.path)?;

    let violations = validate(&value, &fragment);
    if violations.is_empty() {
        println!("valid");
        return Ok(0);
    }
    for violation in &violations {
        println!("{violation}");
    }
    tracing::debug!(path = %args.path, count = violations.len(), "value rejected");
    Ok(1)
}
