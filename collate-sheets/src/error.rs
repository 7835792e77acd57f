//! Error types for collate-sheets.
//!
//! Remote failures are always converted into one of these variants before
//! crossing the crate boundary — callers never see a raw transport error.

use thiserror::Error;

/// All errors that can arise from remote tabular API calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The caller's credentials do not grant access (HTTP 401/403).
    #[error("access denied by the remote API (HTTP {status})")]
    AccessDenied { status: u16 },

    /// The spreadsheet or sheet does not exist (HTTP 404, or a sheet title
    /// absent from the spreadsheet's metadata).
    #[error("not found: {context}")]
    NotFound { context: String },

    /// A retryable network-level failure: transport errors, HTTP 429, 5xx.
    #[error("transient network failure: {message}")]
    Transient { message: String },

    /// Any other non-success HTTP status.
    #[error("unexpected API response (HTTP {status}): {message}")]
    Unexpected { status: u16, message: String },

    /// The response body could not be decoded as the expected JSON shape.
    #[error("failed to decode API response: {0}")]
    Decode(#[source] std::io::Error),
}
