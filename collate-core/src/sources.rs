//! Persisted source list.
//!
//! # Storage layout
//!
//! ```text
//! ~/.collate/
//!   sources.yaml    (ordered source list — mode 0600)
//!   tracking.json   (owned by collate-sync)
//! ```
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)` — explicit home; used in tests with `TempDir`
//! - `fn(…)` — derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::SourcesError;
use crate::types::{SourceList, SourceRef};

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.collate/` — created (mode `0700`) if it does not yet exist.
pub fn state_dir_at(home: &Path) -> Result<PathBuf, SourcesError> {
    let dir = home.join(".collate");
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }
    Ok(dir)
}

/// `<home>/.collate/sources.yaml` — pure, no I/O.
pub fn list_path_at(home: &Path) -> PathBuf {
    home.join(".collate").join("sources.yaml")
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load the source list from `<home>/.collate/sources.yaml`.
///
/// Returns an empty list if the file does not yet exist,
/// `SourcesError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(home: &Path) -> Result<SourceList, SourcesError> {
    let path = list_path_at(home);
    if !path.exists() {
        return Ok(SourceList::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| SourcesError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<SourceList, SourcesError> {
    load_at(&home()?)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save the source list.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
/// `.tmp` is always in the same directory as the target (same filesystem).
pub fn save_at(home: &Path, list: &SourceList) -> Result<(), SourcesError> {
    state_dir_at(home)?; // create dir + 0700 if absent
    let path = list_path_at(home);
    let tmp_path = path.with_file_name("sources.yaml.tmp");

    let yaml = serde_yaml::to_string(list)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(list: &SourceList) -> Result<(), SourcesError> {
    save_at(&home()?, list)
}

// ---------------------------------------------------------------------------
// 4. Add / remove
// ---------------------------------------------------------------------------

/// Append a source to the end of the list and save.
///
/// Rejects exact (spreadsheet, sheet) duplicates — the pass would otherwise
/// fetch and merge the same tab twice.
pub fn add_at(home: &Path, source: SourceRef) -> Result<SourceList, SourcesError> {
    let mut list = load_at(home)?;
    if list.sources.contains(&source) {
        return Err(SourcesError::Duplicate(source));
    }
    list.sources.push(source);
    list.updated_at = Utc::now();
    save_at(home, &list)?;
    Ok(list)
}

/// `add_at` convenience wrapper.
pub fn add(source: SourceRef) -> Result<SourceList, SourcesError> {
    add_at(&home()?, source)
}

/// Remove a source from the list and save.
///
/// Returns `SourcesError::UnknownSource` if it was not registered.
pub fn remove_at(home: &Path, source: &SourceRef) -> Result<SourceList, SourcesError> {
    let mut list = load_at(home)?;
    let before = list.sources.len();
    list.sources.retain(|s| s != source);
    if list.sources.len() == before {
        return Err(SourcesError::UnknownSource(source.clone()));
    }
    list.updated_at = Utc::now();
    save_at(home, &list)?;
    Ok(list)
}

/// `remove_at` convenience wrapper.
pub fn remove(source: &SourceRef) -> Result<SourceList, SourcesError> {
    remove_at(&home()?, source)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, SourcesError> {
    dirs::home_dir().ok_or(SourcesError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), SourcesError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), SourcesError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), SourcesError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), SourcesError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_home() -> TempDir {
        TempDir::new().expect("tempdir")
    }

    fn src(id: &str, sheet: &str) -> SourceRef {
        SourceRef::new(id, sheet)
    }

    #[test]
    fn list_path_is_correct() {
        let home = make_home();
        let path = list_path_at(home.path());
        assert!(path.ends_with(".collate/sources.yaml"));
    }

    #[test]
    fn load_missing_file_returns_empty_list() {
        let home = make_home();
        let list = load_at(home.path()).expect("load");
        assert!(list.sources.is_empty());
    }

    #[test]
    fn add_then_load_preserves_order() {
        let home = make_home();
        add_at(home.path(), src("sheet-b", "Tab")).expect("add b");
        add_at(home.path(), src("sheet-a", "Tab")).expect("add a");

        let list = load_at(home.path()).expect("load");
        assert_eq!(
            list.sources,
            vec![src("sheet-b", "Tab"), src("sheet-a", "Tab")],
            "list order must be insertion order, not sorted"
        );
    }

    #[test]
    fn add_duplicate_is_rejected() {
        let home = make_home();
        add_at(home.path(), src("sheet-a", "Tab")).expect("add");
        let err = add_at(home.path(), src("sheet-a", "Tab")).unwrap_err();
        assert!(matches!(err, SourcesError::Duplicate(_)));
    }

    #[test]
    fn same_spreadsheet_different_sheet_is_allowed() {
        let home = make_home();
        add_at(home.path(), src("sheet-a", "Tab 1")).expect("add 1");
        let list = add_at(home.path(), src("sheet-a", "Tab 2")).expect("add 2");
        assert_eq!(list.sources.len(), 2);
    }

    #[test]
    fn remove_unknown_source_errors() {
        let home = make_home();
        let err = remove_at(home.path(), &src("nope", "Tab")).unwrap_err();
        assert!(matches!(err, SourcesError::UnknownSource(_)));
    }

    #[test]
    fn remove_drops_only_the_named_source() {
        let home = make_home();
        add_at(home.path(), src("sheet-a", "Tab")).expect("add a");
        add_at(home.path(), src("sheet-b", "Tab")).expect("add b");

        let list = remove_at(home.path(), &src("sheet-a", "Tab")).expect("remove");
        assert_eq!(list.sources, vec![src("sheet-b", "Tab")]);
    }

    #[test]
    fn atomic_save_cleans_up_tmp() {
        let home = make_home();
        add_at(home.path(), src("sheet-a", "Tab")).expect("add");
        let tmp = list_path_at(home.path()).with_file_name("sources.yaml.tmp");
        assert!(!tmp.exists(), ".tmp must be gone after successful save");
    }

    #[test]
    fn malformed_yaml_reports_parse_error_with_path() {
        let home = make_home();
        state_dir_at(home.path()).expect("dir");
        std::fs::write(list_path_at(home.path()), "version: [not an int").expect("write");

        let err = load_at(home.path()).unwrap_err();
        match err {
            SourcesError::Parse { path, .. } => {
                assert!(path.ends_with("sources.yaml"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn home_not_found_error_message() {
        assert!(SourcesError::HomeNotFound
            .to_string()
            .contains("home directory"));
    }
}
