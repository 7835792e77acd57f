//! Content fingerprints over filtered row sets.
//!
//! The digest is pinned to an explicit canonical serialization — row count,
//! then per row the cell count, then each cell as a null/present tag with a
//! length-prefixed UTF-8 payload. Identical content in identical order always
//! produces the same digest across process runs; reordering rows changes it.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use collate_core::types::Row;

/// A SHA-256 digest (hex) over an ordered filtered row set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Digest the rows in row-major order.
    ///
    /// An empty slice yields a distinct well-known fingerprint (the digest of
    /// the zero row count) — NOT the same as "no entry stored".
    pub fn of_rows(rows: &[Row]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((rows.len() as u64).to_be_bytes());
        for row in rows {
            hasher.update((row.len() as u64).to_be_bytes());
            for cell in row {
                match cell {
                    None => hasher.update([0u8]),
                    Some(value) => {
                        hasher.update([1u8]);
                        hasher.update((value.len() as u64).to_be_bytes());
                        hasher.update(value.as_bytes());
                    }
                }
            }
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// The well-known fingerprint of an empty filtered set.
    pub fn empty() -> Self {
        Self::of_rows(&[])
    }

    /// Hex digest string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
