//! `collate status` — tracking-store visibility per configured source.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use collate_core::{sources, types::SourceRef};
use collate_sync::{tracker, TrackingEntry};

/// Arguments for `collate status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;

        let list = sources::load_at(&home).context("failed to load source list")?;
        let store = tracker::load_at(&home).context("failed to load tracking store")?;

        let mut rows: Vec<SourceStatus> = list
            .sources
            .iter()
            .map(|source| SourceStatus::new(source, store.entries.get(&source.key()), true))
            .collect();

        // Tracked entries whose source was removed from the list.
        for (key, entry) in &store.entries {
            if !list.sources.iter().any(|s| &s.key() == key) {
                rows.push(SourceStatus::new(&entry.source, Some(entry), false));
            }
        }

        if self.json {
            print_json(&rows, store.last_run)?;
            return Ok(());
        }

        print_table(&rows, store.last_run);
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct SourceStatus {
    source: SourceRef,
    listed: bool,
    entry: Option<EntrySummary>,
}

#[derive(Debug, Clone, Serialize)]
struct EntrySummary {
    fingerprint: String,
    row_count: u32,
    last_processed_at: DateTime<Utc>,
    last_checked_at: DateTime<Utc>,
}

impl SourceStatus {
    fn new(source: &SourceRef, entry: Option<&TrackingEntry>, listed: bool) -> Self {
        Self {
            source: source.clone(),
            listed,
            entry: entry.map(|e| EntrySummary {
                fingerprint: e.fingerprint.to_string(),
                row_count: e.metadata.row_count,
                last_processed_at: e.last_processed_at,
                last_checked_at: e.last_checked_at,
            }),
        }
    }

    fn label(&self) -> &'static str {
        match (&self.entry, self.listed) {
            (Some(_), true) => "TRACKED",
            (Some(_), false) => "UNLISTED",
            (None, _) => "NEVER PROCESSED",
        }
    }

    fn indicator(&self) -> String {
        match (&self.entry, self.listed) {
            (Some(_), true) => "■".green().bold().to_string(),
            (Some(_), false) => "■".magenta().bold().to_string(),
            (None, _) => "■".bright_black().bold().to_string(),
        }
    }
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = " ")]
    indicator: String,
    #[tabled(rename = "source")]
    source: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "last processed")]
    last_processed: String,
    #[tabled(rename = "last checked")]
    last_checked: String,
    #[tabled(rename = "fingerprint")]
    fingerprint: String,
}

#[derive(Serialize)]
struct StatusJson {
    last_run: Option<DateTime<Utc>>,
    sources: Vec<SourceJson>,
}

#[derive(Serialize)]
struct SourceJson {
    spreadsheet_id: String,
    sheet_name: String,
    status: String,
    listed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    entry: Option<EntrySummary>,
}

fn print_json(rows: &[SourceStatus], last_run: Option<DateTime<Utc>>) -> Result<()> {
    let payload = StatusJson {
        last_run,
        sources: rows
            .iter()
            .map(|row| SourceJson {
                spreadsheet_id: row.source.spreadsheet_id.0.clone(),
                sheet_name: row.source.sheet_name.0.clone(),
                status: row.label().to_lowercase().replace(' ', "_"),
                listed: row.listed,
                entry: row.entry.clone(),
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(rows: &[SourceStatus], last_run: Option<DateTime<Utc>>) {
    let last_run_text = last_run
        .map(|at| format_age(at))
        .unwrap_or_else(|| "never".to_string());
    println!(
        "Collate v{} | {} source(s) | last run {}",
        env!("CARGO_PKG_VERSION"),
        rows.iter().filter(|r| r.listed).count(),
        last_run_text,
    );

    if rows.is_empty() {
        println!("No sources configured.");
        return;
    }

    let table_rows: Vec<StatusTableRow> = rows
        .iter()
        .map(|row| StatusTableRow {
            indicator: row.indicator(),
            source: row.source.to_string(),
            status: row.label().to_string(),
            last_processed: row
                .entry
                .as_ref()
                .map(|e| format_age(e.last_processed_at))
                .unwrap_or_else(|| "never".to_string()),
            last_checked: row
                .entry
                .as_ref()
                .map(|e| format_age(e.last_checked_at))
                .unwrap_or_else(|| "never".to_string()),
            fingerprint: row
                .entry
                .as_ref()
                .map(|e| e.fingerprint[..12].to_string())
                .unwrap_or_default(),
        })
        .collect();

    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");
}

/// Compact age from a timestamp: `42s`, `7m`, `3h`, `2d`.
fn format_age(at: DateTime<Utc>) -> String {
    let seconds = Utc::now().signed_duration_since(at).num_seconds().max(0) as u64;
    if seconds < 60 {
        return format!("{seconds}s ago");
    }
    if seconds < 60 * 60 {
        return format!("{}m ago", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h ago", seconds / (60 * 60));
    }
    format!("{}d ago", seconds / (60 * 60 * 24))
}
