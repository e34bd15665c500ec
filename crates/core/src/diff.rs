//! Snapshot comparison producing ordered change events.
//!
//! [`diff_snapshots`] infers inserts, updates, and removals between the
//! previously accepted snapshot and a freshly parsed one. Record validation
//! runs first; invalid records are counted and never emitted. Events are
//! ordered so a consumer applying them in arrival order converges to the
//! file: new/updated interleaved in snapshot iteration order, removals
//! last.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::learner::{validate_record, LearnerRecord};
use crate::snapshot::Snapshot;

// ---------------------------------------------------------------------------
// ChangeKind
// ---------------------------------------------------------------------------

/// The kind of change inferred for a single learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    NewStudent,
    StudentUpdated,
    StudentRemoved,
}

impl ChangeKind {
    /// Wire name used in webhook payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewStudent => "new_student",
            Self::StudentUpdated => "student_updated",
            Self::StudentRemoved => "student_removed",
        }
    }

    /// Parse a wire name. Returns `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new_student" => Some(Self::NewStudent),
            "student_updated" => Some(Self::StudentUpdated),
            "student_removed" => Some(Self::StudentRemoved),
            _ => None,
        }
    }

    /// All valid wire names.
    pub const ALL: &'static [&'static str] =
        &["new_student", "student_updated", "student_removed"];
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ChangeEvent
// ---------------------------------------------------------------------------

/// One inferred insert, update, or removal.
///
/// For removals the record is the *old* one — the last known state of the
/// learner before it disappeared from the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// Normalized admission number.
    pub admission_number: String,
    pub record: LearnerRecord,
}

// ---------------------------------------------------------------------------
// PassSummary
// ---------------------------------------------------------------------------

/// Aggregated counts for one parse-and-diff pass, reported as a single
/// summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub new: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub invalid: usize,
    /// Duplicate admission numbers dropped (parser count plus the differ's
    /// defensive re-check).
    pub duplicates: usize,
    /// Rows skipped for an empty admission number.
    pub skipped_rows: usize,
}

impl PassSummary {
    pub fn has_changes(&self) -> bool {
        self.new + self.updated + self.removed > 0
    }

    /// Human-readable one-liner for notifications.
    pub fn describe(&self) -> String {
        format!(
            "{} new, {} updated, {} removed ({} invalid, {} duplicates)",
            self.new, self.updated, self.removed, self.invalid, self.duplicates
        )
    }
}

/// The result of diffing two snapshots.
#[derive(Debug, Clone, Default)]
pub struct DiffOutcome {
    pub events: Vec<ChangeEvent>,
    pub summary: PassSummary,
}

// ---------------------------------------------------------------------------
// diff_snapshots
// ---------------------------------------------------------------------------

/// Compare a freshly parsed snapshot against the previously accepted one.
///
/// - Records failing validation are counted as invalid and excluded from
///   comparison (they produce no events and do not suppress removals).
/// - A key absent from `old` is `new_student`; present but structurally
///   different is `student_updated`; identical produces no event.
/// - Keys present in `old` but not processed this pass become
///   `student_removed`, carrying the old record, appended after all other
///   events.
/// - Keys already processed this pass are defensively skipped and counted
///   as duplicates (the parser has normally filtered these already).
pub fn diff_snapshots(old: &Snapshot, new: &Snapshot) -> DiffOutcome {
    let mut events = Vec::new();
    let mut summary = PassSummary::default();
    let mut processed: HashSet<&str> = HashSet::with_capacity(new.len());

    for (key, record) in new.iter() {
        if !processed.insert(key.as_str()) {
            summary.duplicates += 1;
            continue;
        }

        if validate_record(record).is_err() {
            summary.invalid += 1;
            processed.remove(key.as_str());
            continue;
        }

        match old.get(key) {
            None => {
                summary.new += 1;
                events.push(ChangeEvent {
                    kind: ChangeKind::NewStudent,
                    admission_number: key.clone(),
                    record: record.clone(),
                });
            }
            Some(previous) if previous != record => {
                summary.updated += 1;
                events.push(ChangeEvent {
                    kind: ChangeKind::StudentUpdated,
                    admission_number: key.clone(),
                    record: record.clone(),
                });
            }
            Some(_) => summary.unchanged += 1,
        }
    }

    for (key, previous) in old.iter() {
        if !processed.contains(key.as_str()) {
            summary.removed += 1;
            events.push(ChangeEvent {
                kind: ChangeKind::StudentRemoved,
                admission_number: key.clone(),
                record: previous.clone(),
            });
        }
    }

    DiffOutcome { events, summary }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
