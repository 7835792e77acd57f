//! Reconciliation pipeline — the canonical entrypoint for a full pass.
//!
//! For each configured source, in list order: fetch metadata → fetch rows →
//! filter → fingerprint-gate → accumulate accepted rows. Afterwards: write
//! the merged CSV export, persist the tracking store, then write status
//! markers back per source. A failure in one source never aborts the pass
//! for the others.
//!
//! The store commit deliberately lands before write-back. A write-back
//! failure therefore leaves exported-and-tracked rows unmarked at the
//! origin; that state is surfaced as [`SourceOutcome::ReconciledButUnmarked`]
//! rather than rolled back or hidden.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use collate_core::types::{FilteredTable, SourceRef, TableMetadata};
use collate_sheets::SheetsApi;

use crate::error::SyncError;
use crate::export::{self, MergedResult};
use crate::filter::filter_new_requests;
use crate::fingerprint::Fingerprint;
use crate::marker::StatusWriter;
use crate::reader::SourceReader;
use crate::tracker::{self, ChangeTracker, Decision, Mode};

// ---------------------------------------------------------------------------
// Options and outcomes
// ---------------------------------------------------------------------------

/// Options for one reconciliation pass.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: Mode,
    /// Fetch, filter and decide, but write nothing: no export, no store
    /// save, no status write-back.
    pub dry_run: bool,
    /// Directory receiving the timestamped CSV export.
    pub out_dir: PathBuf,
}

/// Per-source result of a pass, surfaced to the caller instead of swallowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    /// Rows exported, store committed, origin rows marked.
    Reconciled {
        source: SourceRef,
        rows: usize,
        marked: usize,
    },
    /// Rows exported and store committed, but the status write-back failed.
    ReconciledButUnmarked {
        source: SourceRef,
        rows: usize,
        error: String,
    },
    /// `--dry-run`: the source *would* have been processed.
    WouldReconcile { source: SourceRef, rows: usize },
    /// Filtered content identical to the previous run.
    Skipped { source: SourceRef },
    /// The sheet returned no rows at all (not even a header).
    Empty { source: SourceRef },
    /// The source errored this pass; other sources were unaffected.
    Failed { source: SourceRef, error: String },
}

impl SourceOutcome {
    pub fn source(&self) -> &SourceRef {
        match self {
            SourceOutcome::Reconciled { source, .. }
            | SourceOutcome::ReconciledButUnmarked { source, .. }
            | SourceOutcome::WouldReconcile { source, .. }
            | SourceOutcome::Skipped { source }
            | SourceOutcome::Empty { source }
            | SourceOutcome::Failed { source, .. } => source,
        }
    }
}

/// The written export artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportInfo {
    pub path: PathBuf,
    pub rows: usize,
}

/// Result of a full reconciliation pass.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<SourceOutcome>,
    pub export: Option<ExportInfo>,
    pub dry_run: bool,
}

impl RunReport {
    /// True when no source yielded a Process decision this pass.
    pub fn no_changes(&self) -> bool {
        !self.outcomes.iter().any(|o| {
            matches!(
                o,
                SourceOutcome::Reconciled { .. }
                    | SourceOutcome::ReconciledButUnmarked { .. }
                    | SourceOutcome::WouldReconcile { .. }
            )
        })
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

/// Run one reconciliation pass over `sources`, in order.
///
/// Always persists the tracking store afterwards (unless `dry_run`), even
/// when nothing was merged — `last_checked_at` refreshes must survive a
/// no-change pass.
pub fn run(
    api: &dyn SheetsApi,
    home: &Path,
    sources: &[SourceRef],
    options: &RunOptions,
) -> Result<RunReport, SyncError> {
    let started_at = Utc::now();
    tracing::info!("starting reconciliation pass over {} source(s)", sources.len());

    let mut store = tracker::load_or_default_at(home);
    store.last_run = Some(started_at);
    let mut change_tracker = ChangeTracker::new(store, options.mode);
    let reader = SourceReader::new(api);

    let mut outcomes: Vec<SourceOutcome> = Vec::with_capacity(sources.len());
    let mut accepted: Vec<(usize, FilteredTable)> = Vec::new();

    for source in sources {
        match reconcile_source(&reader, &mut change_tracker, source) {
            Ok(Gate::Accepted(table)) => {
                let rows = table.len();
                let outcome = if options.dry_run {
                    SourceOutcome::WouldReconcile {
                        source: source.clone(),
                        rows,
                    }
                } else {
                    // Marked count is filled in after write-back below.
                    SourceOutcome::Reconciled {
                        source: source.clone(),
                        rows,
                        marked: 0,
                    }
                };
                accepted.push((outcomes.len(), table));
                outcomes.push(outcome);
            }
            Ok(Gate::Skipped) => outcomes.push(SourceOutcome::Skipped {
                source: source.clone(),
            }),
            Ok(Gate::Empty) => {
                tracing::warn!("{}: sheet has no rows", source);
                outcomes.push(SourceOutcome::Empty {
                    source: source.clone(),
                });
            }
            Err(err) => {
                tracing::error!("{}: {err}", source);
                outcomes.push(SourceOutcome::Failed {
                    source: source.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    // Export before store save, store save before write-back.
    let tables: Vec<FilteredTable> = accepted.iter().map(|(_, t)| t.clone()).collect();
    let merged = MergedResult::from_tables(&tables);
    let mut export_info = None;
    if !options.dry_run && !merged.is_empty() {
        std::fs::create_dir_all(&options.out_dir)
            .map_err(|e| crate::error::io_err(&options.out_dir, e))?;
        let path = options.out_dir.join(export::export_file_name(started_at));
        export::write_csv(&path, &merged)?;
        export_info = Some(ExportInfo {
            path,
            rows: merged.len(),
        });
    }

    if !options.dry_run {
        tracker::save_at(home, change_tracker.store())?;
    }

    if !options.dry_run {
        let writer = StatusWriter::new(api);
        for (index, table) in &accepted {
            let rows = table.len();
            match writer.mark_consumed(&table.source, table) {
                Ok(marked) => {
                    outcomes[*index] = SourceOutcome::Reconciled {
                        source: table.source.clone(),
                        rows,
                        marked,
                    };
                }
                Err(err) => {
                    tracing::error!("{}: status write-back failed: {err}", table.source);
                    outcomes[*index] = SourceOutcome::ReconciledButUnmarked {
                        source: table.source.clone(),
                        rows,
                        error: err.to_string(),
                    };
                }
            }
        }
    }

    let report = RunReport {
        started_at,
        outcomes,
        export: export_info,
        dry_run: options.dry_run,
    };
    if report.no_changes() {
        tracing::info!("no new or changed content in any source");
    }
    Ok(report)
}

// ---------------------------------------------------------------------------
// Per-source boundary
// ---------------------------------------------------------------------------

enum Gate {
    Accepted(FilteredTable),
    Skipped,
    Empty,
}

/// Fetch, filter, and gate a single source. Every error crossing this
/// boundary is caught by the caller and isolated to this source.
fn reconcile_source(
    reader: &SourceReader<'_>,
    change_tracker: &mut ChangeTracker,
    source: &SourceRef,
) -> Result<Gate, SyncError> {
    let metadata: TableMetadata = reader.fetch_metadata(source)?;
    let Some(data) = reader.fetch_rows(source)? else {
        return Ok(Gate::Empty);
    };

    let filtered = filter_new_requests(source, &data)?;
    let fingerprint = Fingerprint::of_rows(&filtered.rows);

    match change_tracker.should_process(source, &metadata, &fingerprint) {
        Decision::Skip => {
            change_tracker.touch(source, metadata);
            Ok(Gate::Skipped)
        }
        Decision::Process => {
            change_tracker.commit(source, metadata, fingerprint);
            Ok(Gate::Accepted(filtered))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    use collate_core::types::{SheetName, SpreadsheetId};
    use collate_sheets::{ApiError, RangeUpdate, SheetInfo, SpreadsheetMeta};
    use tempfile::TempDir;

    use crate::marker::SUBMITTED_STATUS;

    // -- scripted fake ------------------------------------------------------

    #[derive(Clone, Copy, PartialEq)]
    enum Fail {
        None,
        AccessDenied,
        BatchTransient,
    }

    struct Fixture {
        values: Vec<Vec<String>>,
        modified_time: String,
        fail: Fail,
    }

    #[derive(Default)]
    struct ScriptedSheets {
        fixtures: HashMap<String, Fixture>,
        batches: RefCell<Vec<(String, Vec<RangeUpdate>)>>,
    }

    impl ScriptedSheets {
        fn with(mut self, source: &SourceRef, fixture: Fixture) -> Self {
            self.fixtures.insert(source.key(), fixture);
            self
        }

        fn fixture(&self, id: &SpreadsheetId, sheet: &SheetName) -> Option<&Fixture> {
            self.fixtures.get(&SourceRef::new(id.0.as_str(), sheet.0.as_str()).key())
        }
    }

    impl SheetsApi for ScriptedSheets {
        fn spreadsheet_meta(&self, id: &SpreadsheetId) -> Result<SpreadsheetMeta, ApiError> {
            let sheets: Vec<SheetInfo> = self
                .fixtures
                .iter()
                .filter(|(key, _)| key.starts_with(&format!("{}_", id.0)))
                .map(|(key, fx)| {
                    if fx.fail == Fail::AccessDenied {
                        return Err(ApiError::AccessDenied { status: 403 });
                    }
                    Ok(SheetInfo {
                        title: key[id.0.len() + 1..].to_string(),
                        row_count: fx.values.len() as u32,
                        column_count: fx.values.first().map_or(0, |r| r.len() as u32),
                    })
                })
                .collect::<Result<_, _>>()?;
            if sheets.is_empty() {
                return Err(ApiError::NotFound {
                    context: format!("spreadsheet {id}"),
                });
            }
            let modified_time = self
                .fixtures
                .iter()
                .find(|(key, _)| key.starts_with(&format!("{}_", id.0)))
                .map(|(_, fx)| fx.modified_time.clone())
                .unwrap_or_default();
            Ok(SpreadsheetMeta {
                modified_time,
                sheets,
            })
        }

        fn sheet_values(
            &self,
            id: &SpreadsheetId,
            sheet: &SheetName,
        ) -> Result<Vec<Vec<String>>, ApiError> {
            let fx = self.fixture(id, sheet).ok_or_else(|| ApiError::NotFound {
                context: format!("sheet '{sheet}'"),
            })?;
            if fx.fail == Fail::AccessDenied {
                return Err(ApiError::AccessDenied { status: 403 });
            }
            Ok(fx.values.clone())
        }

        fn batch_update(
            &self,
            id: &SpreadsheetId,
            updates: &[RangeUpdate],
        ) -> Result<usize, ApiError> {
            let failing = self
                .fixtures
                .iter()
                .any(|(key, fx)| key.starts_with(&format!("{}_", id.0)) && fx.fail == Fail::BatchTransient);
            if failing {
                return Err(ApiError::Transient {
                    message: "write timed out".to_string(),
                });
            }
            self.batches
                .borrow_mut()
                .push((id.0.clone(), updates.to_vec()));
            Ok(updates.len())
        }
    }

    // -- helpers ------------------------------------------------------------

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn request_sheet(names: &[&str]) -> Vec<Vec<String>> {
        let mut values = vec![strings(&["Status", "Name"])];
        for name in names {
            values.push(strings(&["New Request", name]));
        }
        values
    }

    fn fixture(names: &[&str]) -> Fixture {
        Fixture {
            values: request_sheet(names),
            modified_time: "t0".to_string(),
            fail: Fail::None,
        }
    }

    fn options(home: &TempDir) -> RunOptions {
        RunOptions {
            mode: Mode::Tracked,
            dry_run: false,
            out_dir: home.path().join("exports"),
        }
    }

    fn export_files(options: &RunOptions) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&options.out_dir) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
        files.sort();
        files
    }

    fn src_a() -> SourceRef {
        SourceRef::new("sheet-a", "Requests")
    }
    fn src_b() -> SourceRef {
        SourceRef::new("sheet-b", "Requests")
    }

    // -- tests --------------------------------------------------------------

    #[test]
    fn first_pass_exports_and_marks_all_sources() {
        let home = TempDir::new().unwrap();
        let api = ScriptedSheets::default()
            .with(&src_a(), fixture(&["Alice"]))
            .with(&src_b(), fixture(&["Bob", "Carol"]));
        let opts = options(&home);

        let report = run(&api, home.path(), &[src_a(), src_b()], &opts).expect("run");

        assert!(!report.no_changes());
        assert!(matches!(
            report.outcomes[0],
            SourceOutcome::Reconciled { rows: 1, marked: 1, .. }
        ));
        assert!(matches!(
            report.outcomes[1],
            SourceOutcome::Reconciled { rows: 2, marked: 2, .. }
        ));

        let export = report.export.expect("export written");
        assert_eq!(export.rows, 3);
        let contents = std::fs::read_to_string(&export.path).expect("read export");
        assert!(contents.starts_with("Status,Name,source_spreadsheet,source_sheet"));
        assert!(contents.contains("New Request,Alice,sheet-a,Requests"));

        let store = tracker::load_at(home.path()).expect("store");
        assert_eq!(store.entries.len(), 2);
        assert!(store.last_run.is_some());
    }

    #[test]
    fn identical_second_pass_skips_everything_and_writes_no_export() {
        let home = TempDir::new().unwrap();
        let api = ScriptedSheets::default().with(&src_a(), fixture(&["Alice"]));
        let opts = options(&home);

        run(&api, home.path(), &[src_a()], &opts).expect("first run");
        let first_exports = export_files(&opts);

        let report = run(&api, home.path(), &[src_a()], &opts).expect("second run");

        assert!(report.no_changes());
        assert!(matches!(report.outcomes[0], SourceOutcome::Skipped { .. }));
        assert!(report.export.is_none());
        assert_eq!(export_files(&opts), first_exports, "no new export file");
    }

    #[test]
    fn no_change_pass_still_persists_the_store() {
        let home = TempDir::new().unwrap();
        let api = ScriptedSheets::default().with(&src_a(), fixture(&["Alice"]));
        let opts = options(&home);

        run(&api, home.path(), &[src_a()], &opts).expect("first run");
        let first = tracker::load_at(home.path()).expect("store");

        run(&api, home.path(), &[src_a()], &opts).expect("second run");
        let second = tracker::load_at(home.path()).expect("store");

        assert!(second.last_run >= first.last_run, "last_run must advance");
        let key = src_a().key();
        assert!(
            second.entries[&key].last_checked_at >= first.entries[&key].last_checked_at,
            "skip must refresh last_checked_at"
        );
        assert_eq!(
            second.entries[&key].last_processed_at,
            first.entries[&key].last_processed_at,
            "skip must not advance last_processed_at"
        );
    }

    #[test]
    fn metadata_change_without_content_change_still_skips() {
        let home = TempDir::new().unwrap();
        let opts = options(&home);
        let api = ScriptedSheets::default().with(&src_a(), fixture(&["Alice"]));
        run(&api, home.path(), &[src_a()], &opts).expect("first run");

        let mut moved = fixture(&["Alice"]);
        moved.modified_time = "t9".to_string();
        let api = ScriptedSheets::default().with(&src_a(), moved);
        let report = run(&api, home.path(), &[src_a()], &opts).expect("second run");

        assert!(matches!(report.outcomes[0], SourceOutcome::Skipped { .. }));
    }

    #[test]
    fn failing_source_does_not_block_the_rest() {
        let home = TempDir::new().unwrap();
        let opts = options(&home);
        let mut denied = fixture(&["Alice"]);
        denied.fail = Fail::AccessDenied;
        let api = ScriptedSheets::default()
            .with(&src_a(), denied)
            .with(&src_b(), fixture(&["Bob"]));

        let report = run(&api, home.path(), &[src_a(), src_b()], &opts).expect("run");

        assert!(matches!(report.outcomes[0], SourceOutcome::Failed { .. }));
        assert!(matches!(
            report.outcomes[1],
            SourceOutcome::Reconciled { rows: 1, .. }
        ));
        assert_eq!(report.export.expect("export").rows, 1);

        let store = tracker::load_at(home.path()).expect("store");
        assert!(store.entries.contains_key(&src_b().key()));
        assert!(
            !store.entries.contains_key(&src_a().key()),
            "failed source must not gain a tracking entry"
        );
    }

    #[test]
    fn single_column_source_fails_without_crashing_the_pass() {
        let home = TempDir::new().unwrap();
        let opts = options(&home);
        let narrow = Fixture {
            values: vec![strings(&["Status"]), strings(&["New Request"])],
            modified_time: "t0".to_string(),
            fail: Fail::None,
        };
        let api = ScriptedSheets::default()
            .with(&src_a(), narrow)
            .with(&src_b(), fixture(&["Bob"]));

        let report = run(&api, home.path(), &[src_a(), src_b()], &opts).expect("run");

        match &report.outcomes[0] {
            SourceOutcome::Failed { error, .. } => {
                assert!(error.contains("configuration"), "got: {error}")
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(matches!(
            report.outcomes[1],
            SourceOutcome::Reconciled { .. }
        ));
    }

    #[test]
    fn merged_rows_follow_source_list_order() {
        let home = TempDir::new().unwrap();
        let opts = options(&home);
        let api = ScriptedSheets::default()
            .with(&src_a(), fixture(&["Alice"]))
            .with(&src_b(), fixture(&["Bob"]));

        let report = run(&api, home.path(), &[src_b(), src_a()], &opts).expect("run");

        let export = report.export.expect("export");
        let contents = std::fs::read_to_string(&export.path).expect("read");
        let bob = contents.find("Bob").expect("bob row");
        let alice = contents.find("Alice").expect("alice row");
        assert!(bob < alice, "source list order decides merged row order");
    }

    #[test]
    fn write_back_failure_yields_reconciled_but_unmarked() {
        let home = TempDir::new().unwrap();
        let opts = options(&home);
        let mut flaky = fixture(&["Alice"]);
        flaky.fail = Fail::BatchTransient;
        let api = ScriptedSheets::default().with(&src_a(), flaky);

        let report = run(&api, home.path(), &[src_a()], &opts).expect("run");

        match &report.outcomes[0] {
            SourceOutcome::ReconciledButUnmarked { rows, error, .. } => {
                assert_eq!(*rows, 1);
                assert!(error.contains("transient"), "got: {error}");
            }
            other => panic!("expected unmarked outcome, got {other:?}"),
        }
        // Export and store commit happened before the write-back failed.
        assert!(report.export.is_some());
        let store = tracker::load_at(home.path()).expect("store");
        assert!(store.entries.contains_key(&src_a().key()));
    }

    #[test]
    fn force_mode_reprocesses_identical_content() {
        let home = TempDir::new().unwrap();
        let opts = options(&home);
        let api = ScriptedSheets::default().with(&src_a(), fixture(&["Alice"]));
        run(&api, home.path(), &[src_a()], &opts).expect("first run");

        let forced = RunOptions {
            mode: Mode::Force,
            ..options(&home)
        };
        let report = run(&api, home.path(), &[src_a()], &forced).expect("forced run");

        assert!(matches!(
            report.outcomes[0],
            SourceOutcome::Reconciled { rows: 1, .. }
        ));
        assert!(report.export.is_some());
    }

    #[test]
    fn dry_run_touches_nothing_on_disk() {
        let home = TempDir::new().unwrap();
        let opts = RunOptions {
            dry_run: true,
            ..options(&home)
        };
        let api = ScriptedSheets::default().with(&src_a(), fixture(&["Alice"]));

        let report = run(&api, home.path(), &[src_a()], &opts).expect("run");

        assert!(matches!(
            report.outcomes[0],
            SourceOutcome::WouldReconcile { rows: 1, .. }
        ));
        assert!(report.export.is_none());
        assert!(export_files(&opts).is_empty());
        assert!(
            !tracker::store_path_at(home.path()).exists(),
            "dry-run must not create the tracking store"
        );
        assert!(api.batches.borrow().is_empty(), "dry-run must not write back");
    }

    #[test]
    fn empty_sheet_is_reported_and_ignored() {
        let home = TempDir::new().unwrap();
        let opts = options(&home);
        let empty = Fixture {
            values: vec![],
            modified_time: "t0".to_string(),
            fail: Fail::None,
        };
        let api = ScriptedSheets::default()
            .with(&src_a(), empty)
            .with(&src_b(), fixture(&["Bob"]));

        let report = run(&api, home.path(), &[src_a(), src_b()], &opts).expect("run");

        assert!(matches!(report.outcomes[0], SourceOutcome::Empty { .. }));
        assert!(matches!(
            report.outcomes[1],
            SourceOutcome::Reconciled { .. }
        ));
        let store = tracker::load_at(home.path()).expect("store");
        assert!(!store.entries.contains_key(&src_a().key()));
    }

    #[test]
    fn marked_rows_receive_the_submitted_status() {
        let home = TempDir::new().unwrap();
        let opts = options(&home);
        let api = ScriptedSheets::default().with(&src_a(), fixture(&["Alice"]));

        run(&api, home.path(), &[src_a()], &opts).expect("run");

        let batches = api.batches.borrow();
        assert_eq!(batches.len(), 1);
        let (spreadsheet, updates) = &batches[0];
        assert_eq!(spreadsheet, "sheet-a");
        assert_eq!(updates[0].values, vec![vec![SUBMITTED_STATUS.to_string()]]);
    }

    #[test]
    fn corrupt_store_reprocesses_everything() {
        let home = TempDir::new().unwrap();
        let opts = options(&home);
        let api = ScriptedSheets::default().with(&src_a(), fixture(&["Alice"]));
        run(&api, home.path(), &[src_a()], &opts).expect("first run");

        std::fs::write(tracker::store_path_at(home.path()), "{ broken").expect("corrupt");

        let report = run(&api, home.path(), &[src_a()], &opts).expect("second run");
        assert!(
            matches!(report.outcomes[0], SourceOutcome::Reconciled { .. }),
            "first-seen bias after store loss"
        );
    }
}
