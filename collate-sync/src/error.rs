//! Error types for collate-sync.

use std::path::PathBuf;

use thiserror::Error;

use collate_core::error::SourcesError;
use collate_core::types::SourceRef;
use collate_sheets::ApiError;

/// All errors that can arise from a reconciliation pass.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the remote tabular API.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// An error from the source list.
    #[error("source list error: {0}")]
    Sources(#[from] SourcesError),

    /// The source table cannot be filtered as configured (e.g. fewer than
    /// two declared columns).
    #[error("configuration error for {source_ref}: {message}")]
    Configuration { source_ref: SourceRef, message: String },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (tracking store).
    #[error("tracking store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV export error.
    #[error("export CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
