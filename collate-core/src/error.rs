//! Error types for collate-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::SourceRef;

/// All errors that can arise from source-list operations.
#[derive(Debug, Error)]
pub enum SourcesError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load — includes file path and line context from serde_yaml.
    #[error("failed to parse source list at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None` — cannot locate `~/.collate/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The source is already registered.
    #[error("source {0} is already registered")]
    Duplicate(SourceRef),

    /// The source is not in the list.
    #[error("source {0} is not registered")]
    UnknownSource(SourceRef),
}
