//! Row inclusion filter.
//!
//! A row is forwarded iff its first column equals the literal request marker
//! and its second column is non-null and non-empty. Filtering is pure and
//! order-preserving.

use collate_core::types::{FilteredTable, SheetData, SourceRef};

use crate::error::SyncError;

/// Status literal identifying rows awaiting pickup.
pub const NEW_REQUEST: &str = "New Request";

/// Apply the inclusion predicate to normalized sheet data.
///
/// Tables with fewer than two declared columns cannot express the predicate
/// and are a configuration error, never a silent skip.
pub fn filter_new_requests(
    source: &SourceRef,
    data: &SheetData,
) -> Result<FilteredTable, SyncError> {
    if data.headers.len() < 2 {
        return Err(SyncError::Configuration {
            source_ref: source.clone(),
            message: format!(
                "table has {} column(s); the status filter needs at least 2",
                data.headers.len()
            ),
        });
    }

    let rows: Vec<_> = data
        .rows
        .iter()
        .filter(|row| {
            let status_matches = row.first().and_then(|c| c.as_deref()) == Some(NEW_REQUEST);
            let key_present = row
                .get(1)
                .and_then(|c| c.as_deref())
                .is_some_and(|v| !v.is_empty());
            status_matches && key_present
        })
        .cloned()
        .collect();

    tracing::info!(
        "filtered {} of {} row(s) from {}",
        rows.len(),
        data.rows.len(),
        source
    );

    Ok(FilteredTable {
        source: source.clone(),
        headers: data.headers.clone(),
        rows,
    })
}
