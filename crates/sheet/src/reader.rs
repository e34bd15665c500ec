//! Row-by-row spreadsheet reading and cell-level type coercion.
//!
//! The first row is headers and is never treated as data. Columns are
//! positional: admission number, full name, grade, date joined, gender,
//! status. Formula cells arrive from calamine as their cached result, so
//! only value variants need coercion here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use calamine::{open_workbook, Data, Reader, Xlsx};

use rollcall_core::dates;
use rollcall_core::{LearnerRecord, Snapshot};

/// Attempts before a transient open failure is surfaced.
const OPEN_RETRY_ATTEMPTS: usize = 3;

/// Delay between open attempts.
const OPEN_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Positional column layout of the roster sheet.
const COL_ADMISSION: usize = 0;
const COL_FULL_NAME: usize = 1;
const COL_GRADE: usize = 2;
const COL_DATE_JOINED: usize = 3;
const COL_GENDER: usize = 4;
const COL_STATUS: usize = 5;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for roster read failures.
#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    /// The file could not be opened (missing, corrupt container, or a
    /// transient I/O failure that survived the retries).
    #[error("Failed to open roster file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: calamine::XlsxError,
    },

    /// The workbook opened but its first worksheet could not be read.
    #[error("Failed to read worksheet: {0}")]
    Worksheet(#[source] calamine::XlsxError),

    /// The workbook contains no worksheets at all.
    #[error("Roster file {0} has no worksheets")]
    NoWorksheet(PathBuf),
}

// ---------------------------------------------------------------------------
// Parse output
// ---------------------------------------------------------------------------

/// Observability counters for one parse pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseCounters {
    /// Rows that produced a record in the snapshot.
    pub valid: usize,
    /// Rows dropped because their admission number was already seen.
    pub duplicates: usize,
    /// Rows skipped for an empty admission number.
    pub skipped_rows: usize,
}

/// A successfully parsed roster file.
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub snapshot: Snapshot,
    pub counters: ParseCounters,
}

// ---------------------------------------------------------------------------
// read_snapshot
// ---------------------------------------------------------------------------

/// Read the roster file into a deduplicated snapshot.
///
/// Transient I/O failures on open are retried up to [`OPEN_RETRY_ATTEMPTS`]
/// times with a fixed delay; a missing file fails immediately. A workbook
/// with headers but no data rows is valid and yields an empty snapshot.
///
/// This call blocks (file I/O plus the retry sleeps); async callers should
/// run it on a blocking thread.
pub fn read_snapshot(path: &Path) -> Result<ParseOutcome, SheetError> {
    let mut workbook = open_with_retry(path)?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| SheetError::NoWorksheet(path.to_path_buf()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(SheetError::Worksheet)?;

    let mut outcome = ParseOutcome::default();

    // First row is headers; everything after is data.
    for (row_index, row) in range.rows().enumerate().skip(1) {
        let admission = cell_to_string(row.get(COL_ADMISSION).unwrap_or(&Data::Empty));
        if admission.is_empty() {
            outcome.counters.skipped_rows += 1;
            continue;
        }

        let raw_date = cell_to_string(row.get(COL_DATE_JOINED).unwrap_or(&Data::Empty));
        let date_joined = dates::normalize(&raw_date);
        if !date_joined.is_empty() && !dates::is_iso_date(&date_joined) {
            tracing::warn!(
                row = row_index + 1,
                value = %date_joined,
                "Unrecognized join date format, passing through"
            );
        }

        let record = LearnerRecord {
            admission_number: admission.clone(),
            full_name: cell_to_string(row.get(COL_FULL_NAME).unwrap_or(&Data::Empty)),
            grade_name: cell_to_string(row.get(COL_GRADE).unwrap_or(&Data::Empty)),
            date_joined,
            gender: cell_to_string(row.get(COL_GENDER).unwrap_or(&Data::Empty)),
            status: cell_to_string(row.get(COL_STATUS).unwrap_or(&Data::Empty)),
        };

        if outcome.snapshot.insert(record) {
            outcome.counters.valid += 1;
        } else {
            outcome.counters.duplicates += 1;
            tracing::warn!(
                row = row_index + 1,
                admission_number = %admission,
                "Duplicate admission number, keeping first occurrence"
            );
        }
    }

    tracing::debug!(
        path = %path.display(),
        valid = outcome.counters.valid,
        duplicates = outcome.counters.duplicates,
        skipped = outcome.counters.skipped_rows,
        "Roster parse complete"
    );

    Ok(outcome)
}

/// Open the workbook, retrying transient I/O failures.
///
/// A missing file is not transient and fails on the first attempt.
fn open_with_retry(path: &Path) -> Result<Xlsx<std::io::BufReader<std::fs::File>>, SheetError> {
    let mut last_err = None;

    for attempt in 1..=OPEN_RETRY_ATTEMPTS {
        match open_workbook(path) {
            Ok(workbook) => return Ok(workbook),
            Err(e) if is_transient(&e) && attempt < OPEN_RETRY_ATTEMPTS => {
                tracing::warn!(
                    attempt,
                    path = %path.display(),
                    error = %e,
                    "Transient roster open failure, retrying"
                );
                last_err = Some(e);
                std::thread::sleep(OPEN_RETRY_DELAY);
            }
            Err(e) => {
                return Err(SheetError::Open {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        }
    }

    Err(SheetError::Open {
        path: path.to_path_buf(),
        source: last_err.expect("retry loop always records an error"),
    })
}

fn is_transient(error: &calamine::XlsxError) -> bool {
    match error {
        calamine::XlsxError::Io(io) => io.kind() != std::io::ErrorKind::NotFound,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Cell coercion
// ---------------------------------------------------------------------------

/// Coerce one cell to its string form.
///
/// - strings pass through trimmed;
/// - date-formatted numerics become `YYYY-MM-DD`;
/// - plain numerics render as integers when they have no fractional part;
/// - booleans render as `"true"` / `"false"`;
/// - error and empty cells become the empty string.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dates::serial_to_date(dt.as_f64()) {
            Some(date) => date.format("%Y-%m-%d").to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::DateTimeIso(s) => {
            // Keep just the date part of an ISO datetime.
            let prefix = s.get(..10).unwrap_or(s.as_str());
            if dates::is_iso_date(prefix) {
                prefix.to_string()
            } else {
                s.trim().to_string()
            }
        }
        Data::DurationIso(s) => s.trim().to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
