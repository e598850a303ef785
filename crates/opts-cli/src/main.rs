//! # opts CLI entry point
//!
//! Parses arguments, initializes tracing, and dispatches to the handler
//! modules in the library crate.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use opts_cli::lint::{run_lint, LintArgs};
use opts_cli::resolve::{run_resolve, ResolveArgs};
use opts_cli::validate::{run_validate, ValidateArgs};

/// Option schema tooling.
///
/// Lints schema trees, resolves dotted schema paths, and validates values
/// with the same interpreter the option store uses.
#[derive(Parser, Debug)]
#[command(name = "opts", version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Report schema keywords the parser drops.
    Lint(LintArgs),

    /// Show the fragment a dotted path resolves to.
    Resolve(ResolveArgs),

    /// Validate a JSON value against a dotted path.
    Validate(ValidateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Lint(args) => run_lint(args),
        Commands::Resolve(args) => run_resolve(args),
        Commands::Validate(args) => run_validate(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
