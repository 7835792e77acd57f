//! `collate run` — one reconciliation pass over all configured sources.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use collate_core::sources;
use collate_sheets::HttpSheetsClient;
use collate_sync::{
    pipeline::{self, RunOptions, RunReport, SourceOutcome},
    Mode,
};

/// Arguments for `collate run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Reprocess every source, ignoring stored fingerprints.
    #[arg(long)]
    pub force: bool,

    /// Fetch and decide, but write nothing: no export, no tracking update,
    /// no status write-back.
    #[arg(long)]
    pub dry_run: bool,

    /// Directory receiving the timestamped CSV export.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub out_dir: PathBuf,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;

        let list = sources::load_at(&home).context("failed to load source list")?;
        if list.sources.is_empty() {
            println!("No sources configured. Run `collate source add` first.");
            return Ok(());
        }

        let token = std::env::var("COLLATE_TOKEN")
            .context("set COLLATE_TOKEN to a bearer token with spreadsheet access")?;
        let client = HttpSheetsClient::new(token);

        let options = RunOptions {
            mode: if self.force { Mode::Force } else { Mode::Tracked },
            dry_run: self.dry_run,
            out_dir: self.out_dir,
        };
        let report = pipeline::run(&client, &home, &list.sources, &options)
            .context("reconciliation pass failed")?;

        print_report(&report);
        Ok(())
    }
}

fn print_report(report: &RunReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };

    for outcome in &report.outcomes {
        match outcome {
            SourceOutcome::Reconciled { source, rows, marked } => {
                println!("  ✎  {source} — {rows} row(s) exported, {marked} marked");
            }
            SourceOutcome::ReconciledButUnmarked { source, rows, error } => {
                println!("  !  {source} — {rows} row(s) exported but NOT marked: {error}");
            }
            SourceOutcome::WouldReconcile { source, rows } => {
                println!("  ~  {source} — would export {rows} row(s)");
            }
            SourceOutcome::Skipped { source } => {
                println!("  ·  {source} — unchanged");
            }
            SourceOutcome::Empty { source } => {
                println!("  ∅  {source} — sheet is empty");
            }
            SourceOutcome::Failed { source, error } => {
                println!("  ✗  {source} — {error}");
            }
        }
    }

    if report.no_changes() {
        println!("{prefix}✓ no new or changed rows in any source");
        return;
    }

    match &report.export {
        Some(export) => println!(
            "{prefix}✓ exported {} row(s) to {}",
            export.rows,
            export.path.display()
        ),
        None => println!("{prefix}✓ pass complete"),
    }
}
