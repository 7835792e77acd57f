//! Roundtrip serialisation tests for `collate-core` types.
//!
//! Each `#[case]` is isolated — no shared state.

use chrono::Utc;
use collate_core::types::{SourceList, SourceRef, TableMetadata};
use rstest::rstest;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn empty_list() -> SourceList {
    SourceList {
        version: 1,
        sources: vec![],
        updated_at: Utc::now(),
    }
}

fn full_list() -> SourceList {
    SourceList {
        version: 1,
        sources: vec![
            SourceRef::new("1aBcD-efGh", "Form Responses 1"),
            SourceRef::new("2xYz", "Requests"),
        ],
        updated_at: Utc::now(),
    }
}

fn unicode_list() -> SourceList {
    SourceList {
        version: 1,
        sources: vec![SourceRef::new("シート-лист-表", "Tab with spaces & <>&\"'")],
        updated_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Cases
// ---------------------------------------------------------------------------

#[rstest]
#[case::empty(empty_list())]
#[case::full(full_list())]
#[case::unicode(unicode_list())]
fn source_list_yaml_roundtrip(#[case] list: SourceList) {
    let yaml = serde_yaml::to_string(&list).expect("serialize");
    let back: SourceList = serde_yaml::from_str(&yaml).expect("deserialize");
    assert_eq!(back, list);
}

#[test]
fn metadata_roundtrips_including_opaque_modified_time() {
    let meta = TableMetadata {
        row_count: 1000,
        column_count: 26,
        modified_time: "2024-11-05T09:41:12.345Z".to_string(),
    };
    let json = serde_json::to_string(&meta).expect("serialize");
    let back: TableMetadata = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, meta);
}

#[test]
fn metadata_modified_time_is_opaque() {
    // Not a timestamp the system ever parses — equality only.
    let meta = TableMetadata {
        row_count: 1,
        column_count: 1,
        modified_time: "not-a-date".to_string(),
    };
    let json = serde_json::to_string(&meta).expect("serialize");
    let back: TableMetadata = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back.modified_time, "not-a-date");
}
