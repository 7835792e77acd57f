//! # collate-sheets
//!
//! Typed seam over the remote tabular API.
//!
//! The reconciliation core depends only on the [`SheetsApi`] trait; the
//! bundled [`HttpSheetsClient`] is the production implementation.

pub mod api;
pub mod client;
pub mod error;

pub use api::{RangeUpdate, SheetInfo, SheetsApi, SpreadsheetMeta};
pub use client::HttpSheetsClient;
pub use error::ApiError;
