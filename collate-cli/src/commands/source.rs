//! `collate source list|add|remove`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use collate_core::{sources, types::SourceRef};

/// Manage the ordered source list.
#[derive(Subcommand, Debug)]
pub enum SourceCommand {
    /// List all configured sources in reconciliation order.
    List,

    /// Append a source to the list.
    Add(AddArgs),

    /// Remove a source from the list.
    Remove(RemoveArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Remote spreadsheet identifier.
    pub spreadsheet_id: String,

    /// Sheet (tab) name within the spreadsheet.
    pub sheet_name: String,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Remote spreadsheet identifier.
    pub spreadsheet_id: String,

    /// Sheet (tab) name within the spreadsheet.
    pub sheet_name: String,
}

pub fn run(cmd: SourceCommand) -> Result<()> {
    match cmd {
        SourceCommand::List => list(),
        SourceCommand::Add(args) => add(args),
        SourceCommand::Remove(args) => remove(args),
    }
}

fn list() -> Result<()> {
    let list = sources::load().context("failed to load source list")?;

    if list.sources.is_empty() {
        println!("No sources configured.");
        println!("Run: collate source add <spreadsheet-id> <sheet-name>");
        return Ok(());
    }

    for (position, source) in list.sources.iter().enumerate() {
        println!(
            "  {}. {} ({})",
            position + 1,
            source.sheet_name,
            source.spreadsheet_id
        );
    }

    Ok(())
}

fn add(args: AddArgs) -> Result<()> {
    let source = SourceRef::new(args.spreadsheet_id, args.sheet_name);
    let list = sources::add(source.clone())
        .with_context(|| format!("failed to add source {source}"))?;

    println!(
        "✓ Added '{}' ({} source(s) configured)",
        source,
        list.sources.len()
    );
    Ok(())
}

fn remove(args: RemoveArgs) -> Result<()> {
    let source = SourceRef::new(args.spreadsheet_id, args.sheet_name);
    let list = sources::remove(&source)
        .with_context(|| format!("failed to remove source {source}"))?;

    println!(
        "✓ Removed '{}' ({} source(s) remaining)",
        source,
        list.sources.len()
    );
    Ok(())
}
