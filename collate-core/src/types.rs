//! Domain types for the Collate source list and fetched sheet data.
//!
//! All types are serializable/deserializable via serde. Timestamps are
//! `chrono::DateTime<Utc>` and round-trip through RFC 3339.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed remote spreadsheet identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpreadsheetId(pub String);

impl fmt::Display for SpreadsheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for SpreadsheetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SpreadsheetId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A strongly-typed name of a sheet (tab) within a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SheetName(pub String);

impl fmt::Display for SheetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for SheetName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SheetName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Source identity
// ---------------------------------------------------------------------------

/// One fetchable (spreadsheet, sheet) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    pub spreadsheet_id: SpreadsheetId,
    pub sheet_name: SheetName,
}

impl SourceRef {
    pub fn new(spreadsheet_id: impl Into<SpreadsheetId>, sheet_name: impl Into<SheetName>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
        }
    }

    /// Tracking-store key: `<spreadsheet_id>_<sheet_name>`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.spreadsheet_id.0, self.sheet_name.0)
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.spreadsheet_id, self.sheet_name)
    }
}

// ---------------------------------------------------------------------------
// Fetched data
// ---------------------------------------------------------------------------

/// Cheap per-sheet metadata, retrieved independently of the row data.
///
/// `modified_time` is an opaque string from the remote API; it is only ever
/// compared for equality, never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub row_count: u32,
    pub column_count: u32,
    pub modified_time: String,
}

/// A single width-normalized data row. Cells missing from the remote payload
/// are `None`; trailing cells beyond the header width are dropped.
pub type Row = Vec<Option<String>>;

/// Rectangular sheet data: the header row plus width-normalized data rows.
///
/// Produced by the source reader; every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetData {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

/// Rows that survived the inclusion filter, with their source identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredTable {
    pub source: SourceRef,
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl FilteredTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Source list
// ---------------------------------------------------------------------------

/// Root of the persisted source list.
///
/// `sources` order is significant: reconciliation passes visit sources in
/// exactly this order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceList {
    pub version: u32,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    pub updated_at: DateTime<Utc>,
}

impl Default for SourceList {
    fn default() -> Self {
        Self {
            version: 1,
            sources: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
