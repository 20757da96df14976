//! `commercetxt` CLI - parse, merge, validate, and summarize `CommerceTXT` documents.
//!
//! This is the entry point library backing the `commercetxt` binary.
//! Command execution lives here so `main.rs` stays a thin wrapper and
//! the logic remains testable with `assert_cmd`.

use anyhow::Result;
use clap::Parser as ClapParser;
use colored::Colorize;
use commercetxt_core::{resolver, validator, Config, Parser};
use tracing::debug;

pub mod cli;
pub mod discovery;
mod logging;

use cli::Cli;
use logging::initialize_logging;

/// Runs the `commercetxt` CLI against the process's real argv and
/// returns the process exit code.
///
/// # Errors
///
/// Returns an error if logging initialization fails or the target
/// file cannot be read for a reason other than not existing (that
/// case is handled as a clean exit 1, not an error).
pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    initialize_logging(&cli)?;
    run_with(&cli)
}

/// Runs the CLI logic against an already-parsed [`Cli`], returning the
/// process exit code. Split out from [`run`] so tests can drive it
/// without going through `std::process::exit`.
pub fn run_with(cli: &Cli) -> Result<i32> {
    if !cli.path.is_file() {
        eprintln!("File not found: {}", cli.path.display());
        return Ok(1);
    }

    let config = Config::load().unwrap_or_default();

    let text = std::fs::read_to_string(&cli.path)?;
    let parser = Parser::new()
        .with_nested(true)
        .with_strict(cli.strict)
        .with_limits(config.limits.clone());
    let mut doc = parser.parse(&text);
    doc.source_path = Some(cli.path.clone());

    if !cli.no_ancestor {
        let ancestors = discovery::discover_ancestors(&cli.path);
        debug!(count = ancestors.len(), "discovered ancestor commerce.txt files");
        let mut inherited: Option<commercetxt_core::ParseResult> = None;
        for ancestor_path in ancestors {
            let ancestor_text = std::fs::read_to_string(&ancestor_path)?;
            let ancestor_doc = parser.parse(&ancestor_text);
            inherited = Some(match inherited {
                None => ancestor_doc,
                Some(acc) => resolver::merge(&acc, &ancestor_doc),
            });
        }
        if let Some(acc) = inherited {
            doc = resolver::merge(&acc, &doc);
        }
    }

    validator::validate_with_limits(&mut doc, cli.strict, &config.limits)?;

    if cli.prompt {
        let bridge = commercetxt_core::Bridge::new();
        println!("=== GENERATED AI PROMPT ===");
        println!("{}", bridge.prompt(&doc));
        return Ok(0);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        print_summary(&doc);
    }

    if cli.strict && doc.status() != "VALID" {
        return Ok(1);
    }
    Ok(0)
}

fn print_summary(doc: &commercetxt_core::ParseResult) {
    let status = doc.status();
    let colored_status = match status {
        "VALID" => status.green().bold(),
        "WARN" => status.yellow().bold(),
        _ => status.red().bold(),
    };
    println!("Status: {colored_status}");

    if let Some(version) = &doc.version {
        println!("Version: {version}");
    }
    println!("Sections: {}", doc.directives.len());

    for error in &doc.errors {
        println!("{} {error}", "ERROR:".red());
    }
    for warning in &doc.warnings {
        println!("{} {warning}", "WARN:".yellow());
    }
    for flag in &doc.trust_flags {
        println!("{} {flag}", "FLAG:".cyan());
    }
}
