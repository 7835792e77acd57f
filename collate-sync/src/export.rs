//! Merged CSV export.
//!
//! Column layout: the union of every accepted table's headers in first-seen
//! order, followed by the two provenance columns. Row order is source
//! iteration order, then original fetch order. The file name embeds the pass
//! timestamp so no pass ever overwrites a prior export.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use collate_core::types::FilteredTable;

use crate::error::SyncError;

pub const EXPORT_BASE_NAME: &str = "combined_requests";
pub const SOURCE_SPREADSHEET_COLUMN: &str = "source_spreadsheet";
pub const SOURCE_SHEET_COLUMN: &str = "source_sheet";

/// `combined_requests_<sortable timestamp>.csv`
pub fn export_file_name(at: DateTime<Utc>) -> String {
    format!("{EXPORT_BASE_NAME}_{}.csv", at.format("%Y-%m-%d_%H-%M-%S"))
}

/// All accepted rows of a pass, flattened onto one column set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedResult {
    /// Union of source headers plus the provenance columns (always last two).
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl MergedResult {
    /// Merge accepted tables in the order given.
    ///
    /// Rows from a table that lacks one of the union columns get `None` in
    /// that position (sheets with differing headers still merge).
    pub fn from_tables(tables: &[FilteredTable]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for table in tables {
            for header in &table.headers {
                if !columns.contains(header) {
                    columns.push(header.clone());
                }
            }
        }
        let data_width = columns.len();
        columns.push(SOURCE_SPREADSHEET_COLUMN.to_string());
        columns.push(SOURCE_SHEET_COLUMN.to_string());

        let mut rows = Vec::new();
        for table in tables {
            // First occurrence of a header name wins within one table.
            let position_of = |name: &str| table.headers.iter().position(|h| h == name);
            for row in &table.rows {
                let mut out: Vec<Option<String>> = Vec::with_capacity(columns.len());
                for column in &columns[..data_width] {
                    let cell = position_of(column).and_then(|i| row.get(i).cloned().flatten());
                    out.push(cell);
                }
                out.push(Some(table.source.spreadsheet_id.0.clone()));
                out.push(Some(table.source.sheet_name.0.clone()));
                rows.push(out);
            }
        }

        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Write the merged result as CSV. Null cells become empty fields.
pub fn write_csv(path: &Path, merged: &MergedResult) -> Result<PathBuf, SyncError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&merged.columns)?;
    for row in &merged.rows {
        writer.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))?;
    }
    writer.flush().map_err(|e| crate::error::io_err(path, e))?;
    tracing::info!("wrote {} row(s) to {}", merged.len(), path.display());
    Ok(path.to_path_buf())
}
