//! Collate core library — domain types, source-list persistence, errors.
//!
//! Public API surface:
//! - [`types`] — newtypes and domain structs
//! - [`error`] — [`SourcesError`]
//! - [`sources`] — load / save / add / remove

pub mod error;
pub mod sources;
pub mod types;

pub use error::SourcesError;
pub use types::{
    FilteredTable, Row, SheetData, SheetName, SourceList, SourceRef, SpreadsheetId, TableMetadata,
};
