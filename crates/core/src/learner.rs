//! Learner record value type, natural-key normalization, and record-level
//! validation.
//!
//! A [`LearnerRecord`] is the unit of change detection: equality is
//! structural over all fields, and two snapshots are diffed record by
//! record keyed on the normalized admission number.

use serde::{Deserialize, Serialize};

/// One learner row as read from the roster spreadsheet.
///
/// All fields are strings as they appear in the file after cell coercion;
/// `date_joined` is normalized to `YYYY-MM-DD` before comparison wherever
/// the source value is recognizable as a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerRecord {
    /// Natural key, matched case-insensitively.
    pub admission_number: String,
    pub full_name: String,
    pub grade_name: String,
    /// ISO 8601 date string (`YYYY-MM-DD`) when recognizable.
    pub date_joined: String,
    pub gender: String,
    pub status: String,
}

/// Normalize an admission number for use as a snapshot key.
///
/// Trims surrounding whitespace and lower-cases, so `" ADM001 "` and
/// `"adm001"` address the same record.
pub fn normalize_admission_number(raw: &str) -> String {
    raw.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Record validation
// ---------------------------------------------------------------------------

/// Why a record was rejected before diffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordRejection {
    MissingName,
    MissingGrade,
    MalformedDate,
}

impl RecordRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingName => "missing name",
            Self::MissingGrade => "missing grade",
            Self::MalformedDate => "malformed date",
        }
    }
}

impl std::fmt::Display for RecordRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check a record before it is allowed to produce change events.
///
/// A record missing its name or grade, or whose join date does not have the
/// `YYYY-MM-DD` shape, is rejected. Rejections are counted by the caller,
/// never raised as errors.
pub fn validate_record(record: &LearnerRecord) -> Result<(), RecordRejection> {
    if record.full_name.trim().is_empty() {
        return Err(RecordRejection::MissingName);
    }
    if record.grade_name.trim().is_empty() {
        return Err(RecordRejection::MissingGrade);
    }
    if !crate::dates::is_iso_date(&record.date_joined) {
        return Err(RecordRejection::MalformedDate);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> LearnerRecord {
        LearnerRecord {
            admission_number: "ADM001".into(),
            full_name: "Jane Doe".into(),
            grade_name: "Grade 4".into(),
            date_joined: "2022-01-01".into(),
            gender: "F".into(),
            status: "active".into(),
        }
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_admission_number("  ADM001 "), "adm001");
        assert_eq!(normalize_admission_number("a1"), "a1");
    }

    #[test]
    fn valid_record_passes() {
        assert!(validate_record(&record()).is_ok());
    }

    #[test]
    fn missing_name_is_rejected() {
        let mut r = record();
        r.full_name = "   ".into();
        assert_eq!(validate_record(&r), Err(RecordRejection::MissingName));
    }

    #[test]
    fn missing_grade_is_rejected() {
        let mut r = record();
        r.grade_name = String::new();
        assert_eq!(validate_record(&r), Err(RecordRejection::MissingGrade));
    }

    #[test]
    fn unparseable_date_is_rejected() {
        let mut r = record();
        r.date_joined = "next Tuesday".into();
        assert_eq!(validate_record(&r), Err(RecordRejection::MalformedDate));
    }

    #[test]
    fn structural_equality_covers_all_fields() {
        let a = record();
        let mut b = record();
        assert_eq!(a, b);
        b.status = "inactive".into();
        assert_ne!(a, b);
    }
}
