//! Change tracker — fingerprint-based dedup across reconciliation passes.
//!
//! Persists a `TrackingStore` JSON document at `<home>/.collate/tracking.json`.
//! Writes use the same atomic `.tmp` + rename pattern as the source list.
//!
//! ## Decision algorithm
//!
//! Metadata deltas (row count, modified time) are advisory only: they are
//! logged, then the pass fetches and filters rows regardless and compares the
//! content fingerprint against the stored one. The fingerprint is
//! authoritative — metadata can go stale without the filtered content
//! changing, and vice versa. A source with no stored entry is always
//! processed (first-seen bias). Force mode bypasses comparison entirely.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use collate_core::types::{SourceRef, TableMetadata};

use crate::error::{io_err, SyncError};
use crate::fingerprint::Fingerprint;

// ---------------------------------------------------------------------------
// Store types
// ---------------------------------------------------------------------------

/// Tracking state for one source, keyed by [`SourceRef::key`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEntry {
    pub source: SourceRef,
    pub metadata: TableMetadata,
    pub fingerprint: Fingerprint,
    pub last_processed_at: DateTime<Utc>,
    pub last_checked_at: DateTime<Utc>,
}

/// On-disk tracking store payload. Saved wholesale after every pass — a crash
/// mid-pass loses the entries updated so far, an accepted limitation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingStore {
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub entries: BTreeMap<String, TrackingEntry>,
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// `<home>/.collate/tracking.json` — pure, no I/O.
pub fn store_path_at(home: &Path) -> PathBuf {
    home.join(".collate").join("tracking.json")
}

/// Load the tracking store.
///
/// Returns an empty store if the file does not yet exist.
pub fn load_at(home: &Path) -> Result<TrackingStore, SyncError> {
    let path = store_path_at(home);
    if !path.exists() {
        return Ok(TrackingStore::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Load the tracking store, falling back to an empty store on any failure.
///
/// The fallback biases toward re-processing everything rather than silently
/// dropping data; the failure itself is logged.
pub fn load_or_default_at(home: &Path) -> TrackingStore {
    match load_at(home) {
        Ok(store) => store,
        Err(err) => {
            tracing::warn!("tracking store unreadable ({err}); treating all sources as first-seen");
            TrackingStore::default()
        }
    }
}

/// Save the tracking store atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_at(home: &Path, store: &TrackingStore) -> Result<(), SyncError> {
    let path = store_path_at(home);
    let Some(dir) = path.parent() else {
        return Err(io_err(
            path,
            std::io::Error::other("invalid tracking store path"),
        ));
    };

    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(store)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Outcome of a change check for one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Process,
    Skip,
}

/// Operating mode of the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Fingerprint-gated dedup (default).
    Tracked,
    /// Always process; commit overwrites the entry unconditionally.
    Force,
}

/// Wraps a [`TrackingStore`] with the skip/process decision logic for one
/// reconciliation pass. Call [`into_store`](Self::into_store) afterwards to
/// get the updated store back for persistence.
pub struct ChangeTracker {
    store: TrackingStore,
    mode: Mode,
}

impl ChangeTracker {
    pub fn new(store: TrackingStore, mode: Mode) -> Self {
        Self { store, mode }
    }

    /// Decide whether the freshly filtered content of `source` needs
    /// processing.
    pub fn should_process(
        &self,
        source: &SourceRef,
        metadata: &TableMetadata,
        fingerprint: &Fingerprint,
    ) -> Decision {
        if self.mode == Mode::Force {
            tracing::info!("force mode: processing {} unconditionally", source);
            return Decision::Process;
        }

        let Some(previous) = self.store.entries.get(&source.key()) else {
            tracing::info!("{} not seen before; processing", source);
            return Decision::Process;
        };

        // Advisory signals only — never gate the decision.
        if metadata.row_count != previous.metadata.row_count {
            tracing::info!(
                "{}: row count changed {} -> {}",
                source,
                previous.metadata.row_count,
                metadata.row_count
            );
        }
        if metadata.modified_time != previous.metadata.modified_time {
            tracing::info!("{}: modified time changed", source);
        }

        if *fingerprint == previous.fingerprint {
            tracing::info!("{}: filtered content identical to previous run; skipping", source);
            Decision::Skip
        } else {
            tracing::info!("{}: filtered content changed; processing", source);
            Decision::Process
        }
    }

    /// Record a processed source: overwrite the entry with the new metadata,
    /// fingerprint, and timestamps.
    pub fn commit(
        &mut self,
        source: &SourceRef,
        metadata: TableMetadata,
        fingerprint: Fingerprint,
    ) {
        let now = Utc::now();
        self.store.entries.insert(
            source.key(),
            TrackingEntry {
                source: source.clone(),
                metadata,
                fingerprint,
                last_processed_at: now,
                last_checked_at: now,
            },
        );
    }

    /// Metadata-only refresh on skip: update the stored metadata and
    /// `last_checked_at`, leaving fingerprint and `last_processed_at` alone.
    pub fn touch(&mut self, source: &SourceRef, metadata: TableMetadata) {
        if let Some(entry) = self.store.entries.get_mut(&source.key()) {
            entry.metadata = metadata;
            entry.last_checked_at = Utc::now();
        }
    }

    pub fn store(&self) -> &TrackingStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TrackingStore {
        &mut self.store
    }

    pub fn into_store(self) -> TrackingStore {
        self.store
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
