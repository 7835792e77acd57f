//! Status write-back — marks consumed rows in the origin sheet.
//!
//! Re-fetches the sheet's *current* rows rather than reusing the earlier
//! snapshot; the table may have moved between fetch and write-back, and
//! re-reading is the only defence this system attempts against that window.

use collate_core::types::{FilteredTable, SourceRef};
use collate_sheets::{RangeUpdate, SheetsApi};

use crate::error::SyncError;
use crate::filter::NEW_REQUEST;

/// Status literal written into consumed rows' first column.
pub const SUBMITTED_STATUS: &str = "Submitted / In Progress";

/// Writes completion markers through the [`SheetsApi`] seam.
pub struct StatusWriter<'a> {
    api: &'a dyn SheetsApi,
}

impl<'a> StatusWriter<'a> {
    pub fn new(api: &'a dyn SheetsApi) -> Self {
        Self { api }
    }

    /// Mark the origin rows matching `accepted` as consumed.
    ///
    /// Matching: a raw row qualifies if its first column still reads
    /// `"New Request"`; the first not-yet-consumed accepted row whose second
    /// column equals the raw row's second column claims it. Each accepted row
    /// marks at most one raw row and each raw row is written at most once,
    /// so duplicate values cannot double-mark.
    ///
    /// All writes go out in one batch call; an empty schedule makes no
    /// network call at all. Returns the number of rows marked.
    pub fn mark_consumed(
        &self,
        source: &SourceRef,
        accepted: &FilteredTable,
    ) -> Result<usize, SyncError> {
        let raw = self
            .api
            .sheet_values(&source.spreadsheet_id, &source.sheet_name)?;

        let mut consumed = vec![false; accepted.rows.len()];
        let mut updates: Vec<RangeUpdate> = Vec::new();

        // Skip the header row; values index i is sheet row i + 1 (1-based).
        for (index, raw_row) in raw.iter().enumerate().skip(1) {
            if raw_row.first().map(String::as_str) != Some(NEW_REQUEST) {
                continue;
            }
            let Some(raw_key) = raw_row.get(1) else {
                continue;
            };

            let matched = (0..accepted.rows.len()).find(|&slot| {
                !consumed[slot]
                    && accepted.rows[slot].get(1).and_then(|c| c.as_deref())
                        == Some(raw_key.as_str())
            });
            if let Some(slot) = matched {
                consumed[slot] = true;
                updates.push(RangeUpdate {
                    range: a1_status_cell(&source.sheet_name.0, index + 1),
                    values: vec![vec![SUBMITTED_STATUS.to_string()]],
                });
            }
        }

        if updates.is_empty() {
            tracing::info!("{}: no rows to mark", source);
            return Ok(0);
        }

        let applied = self.api.batch_update(&source.spreadsheet_id, &updates)?;
        tracing::info!("{}: marked {} row(s) as consumed", source, applied);
        Ok(applied)
    }
}

/// A1 reference to the status cell of `row` (1-based), with the sheet title
/// quoted (titles may contain spaces; embedded quotes are doubled).
fn a1_status_cell(sheet_title: &str, row: usize) -> String {
    format!("'{}'!A{row}", sheet_title.replace('\'', "''"))
}
