//! The remote tabular API seam.
//!
//! [`SheetsApi`] is the only surface the reconciliation core sees; the HTTP
//! client implements it, tests substitute an in-memory fake.

use collate_core::types::{SheetName, SpreadsheetId};

use crate::error::ApiError;

/// Per-sheet grid properties from spreadsheet metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetInfo {
    pub title: String,
    pub row_count: u32,
    pub column_count: u32,
}

/// Spreadsheet-level metadata: every sheet's grid size plus the opaque
/// last-modified stamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetMeta {
    pub modified_time: String,
    pub sheets: Vec<SheetInfo>,
}

impl SpreadsheetMeta {
    /// Grid properties for a sheet title, if present.
    pub fn sheet(&self, title: &SheetName) -> Option<&SheetInfo> {
        self.sheets.iter().find(|s| s.title == title.0)
    }
}

/// One cell-range write scheduled for a batch update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeUpdate {
    /// A1-notation range, e.g. `'Form Responses 1'!A5`.
    pub range: String,
    pub values: Vec<Vec<String>>,
}

/// Blocking client operations against the remote tabular store.
///
/// Values are returned exactly as stored: the first row of
/// [`sheet_values`](Self::sheet_values) is the header row, and short rows are
/// NOT padded here — width normalization is the reader's job.
pub trait SheetsApi {
    /// Fetch spreadsheet metadata (cheap; no row data).
    fn spreadsheet_meta(&self, id: &SpreadsheetId) -> Result<SpreadsheetMeta, ApiError>;

    /// Fetch all rows of one sheet. An empty vec means the sheet has no data.
    fn sheet_values(
        &self,
        id: &SpreadsheetId,
        sheet: &SheetName,
    ) -> Result<Vec<Vec<String>>, ApiError>;

    /// Apply all updates in a single batch call. Returns the number of rows
    /// the remote reports as updated.
    fn batch_update(
        &self,
        id: &SpreadsheetId,
        updates: &[RangeUpdate],
    ) -> Result<usize, ApiError>;
}
