//! # collate-sync
//!
//! Change-detection and reconciliation core.
//!
//! Call [`pipeline::run`] for a full pass: fetch → filter → fingerprint-gate
//! → merged CSV export → tracking-store commit → status write-back.

pub mod error;
pub mod export;
pub mod filter;
pub mod fingerprint;
pub mod marker;
pub mod pipeline;
pub mod reader;
pub mod tracker;

pub use error::SyncError;
pub use fingerprint::Fingerprint;
pub use pipeline::{run, ExportInfo, RunOptions, RunReport, SourceOutcome};
pub use tracker::{ChangeTracker, Decision, Mode, TrackingEntry, TrackingStore};
