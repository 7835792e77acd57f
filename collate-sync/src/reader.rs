//! Source reader — fetches metadata and rows for one (spreadsheet, sheet).
//!
//! Metadata and row fetches are independent calls: metadata is cheap, rows
//! are expensive. Width normalization happens here so everything downstream
//! sees rectangular data.

use collate_core::types::{Row, SheetData, SourceRef, TableMetadata};
use collate_sheets::{ApiError, SheetsApi};

use crate::error::SyncError;

/// Reads one source table through the [`SheetsApi`] seam.
pub struct SourceReader<'a> {
    api: &'a dyn SheetsApi,
}

impl<'a> SourceReader<'a> {
    pub fn new(api: &'a dyn SheetsApi) -> Self {
        Self { api }
    }

    /// Fetch grid metadata for the source's sheet.
    ///
    /// A sheet title missing from the spreadsheet's metadata is `NotFound`,
    /// same as a missing spreadsheet.
    pub fn fetch_metadata(&self, source: &SourceRef) -> Result<TableMetadata, SyncError> {
        let meta = self.api.spreadsheet_meta(&source.spreadsheet_id)?;
        let sheet = meta.sheet(&source.sheet_name).ok_or_else(|| {
            SyncError::Api(ApiError::NotFound {
                context: format!("sheet '{}' in spreadsheet {}", source.sheet_name, source.spreadsheet_id),
            })
        })?;
        Ok(TableMetadata {
            row_count: sheet.row_count,
            column_count: sheet.column_count,
            modified_time: meta.modified_time,
        })
    }

    /// Fetch the sheet's rows, strip the header row, and normalize every data
    /// row to the header width (pad with `None`, truncate extras).
    ///
    /// Returns `None` when the sheet has no rows at all (not even a header).
    pub fn fetch_rows(&self, source: &SourceRef) -> Result<Option<SheetData>, SyncError> {
        let values = self
            .api
            .sheet_values(&source.spreadsheet_id, &source.sheet_name)?;
        let Some((header_row, data_rows)) = values.split_first() else {
            return Ok(None);
        };

        let headers: Vec<String> = header_row.to_vec();
        let width = headers.len();
        let rows: Vec<Row> = data_rows
            .iter()
            .map(|raw| normalize_row(raw, width))
            .collect();

        tracing::debug!(
            "fetched {} data row(s) x {} column(s) from {}",
            rows.len(),
            width,
            source
        );
        Ok(Some(SheetData { headers, rows }))
    }
}

fn normalize_row(raw: &[String], width: usize) -> Row {
    let mut row: Row = raw.iter().take(width).map(|c| Some(c.clone())).collect();
    row.resize(width, None);
    row
}
