//! Collate — spreadsheet request collation CLI.
//!
//! # Usage
//!
//! ```text
//! collate source add <spreadsheet-id> <sheet-name>
//! collate source list
//! collate source remove <spreadsheet-id> <sheet-name>
//! collate run [--force] [--dry-run] [--out-dir <dir>]
//! collate status [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{run::RunArgs, source::SourceCommand, status::StatusArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "collate",
    version,
    about = "Collect, deduplicate and export request rows from remote spreadsheets",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage the ordered list of source sheets.
    Source {
        #[command(subcommand)]
        command: SourceCommand,
    },

    /// Run one reconciliation pass over all configured sources.
    Run(RunArgs),

    /// Show tracking state per configured source.
    Status(StatusArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Source { command } => commands::source::run(command),
        Commands::Run(args) => args.run(),
        Commands::Status(args) => args.run(),
    }
}
