//! The deduplicated roster snapshot and the cheap file-change fingerprint.
//!
//! A [`Snapshot`] is "the file's contents at the last successful read":
//! an insertion-ordered map from normalized admission number to
//! [`LearnerRecord`]. It is built once per parse pass and replaced
//! atomically — never mutated after publication — so readers may hold a
//! reference to an old snapshot while a new one is being built.

use std::io;
use std::path::Path;
use std::time::SystemTime;

use indexmap::IndexMap;
use serde::Serialize;

use crate::learner::{normalize_admission_number, LearnerRecord};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Ordered, deduplicated view of the roster file.
///
/// Keys are normalized (trimmed, lower-cased) admission numbers. The first
/// occurrence in file order wins; later duplicates are reported back to the
/// caller and never overwrite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    records: IndexMap<String, LearnerRecord>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record under its normalized admission number.
    ///
    /// Returns `false` if the key was already present (the existing record
    /// is kept, the new one dropped).
    pub fn insert(&mut self, record: LearnerRecord) -> bool {
        let key = normalize_admission_number(&record.admission_number);
        if self.records.contains_key(&key) {
            return false;
        }
        self.records.insert(key, record);
        true
    }

    /// Look up a record by admission number (normalized before lookup).
    pub fn get(&self, admission_number: &str) -> Option<&LearnerRecord> {
        self.records
            .get(&normalize_admission_number(admission_number))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(&normalize_admission_number(key))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate `(normalized key, record)` pairs in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &LearnerRecord)> {
        self.records.iter()
    }
}

// ---------------------------------------------------------------------------
// FileState
// ---------------------------------------------------------------------------

/// Cheap `(modified time, size)` fingerprint checked before paying for a
/// full parse. Updated only after a successful parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileState {
    pub modified: SystemTime,
    pub size_bytes: u64,
}

impl FileState {
    /// Read the current fingerprint of a file.
    pub fn of(path: &Path) -> io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        Ok(Self {
            modified: meta.modified()?,
            size_bytes: meta.len(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
