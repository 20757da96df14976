//! Command-line argument definitions.

use clap::Parser as ClapParser;
use std::path::PathBuf;

/// Parse, merge, validate, and summarize a `CommerceTXT` document.
#[derive(Debug, Clone, ClapParser)]
#[command(name = "commercetxt", version, about, long_about = None)]
pub struct Cli {
    /// Path to the `.txt` document to process.
    pub path: PathBuf,

    /// Emit the parsed result as JSON (version, directives, errors,
    /// warnings, trust_flags) instead of the human-readable summary.
    #[arg(long)]
    pub json: bool,

    /// Treat any validation error as fatal: exit 1 instead of printing
    /// a WARN/INVALID summary.
    #[arg(long)]
    pub strict: bool,

    /// Print the generated AI prompt instead of the validation summary.
    #[arg(long)]
    pub prompt: bool,

    /// Skip automatic discovery and merge of an ancestor `commerce.txt`.
    #[arg(long)]
    pub no_ancestor: bool,

    /// Enable debug-level logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all logging below error level.
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,
}
