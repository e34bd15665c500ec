//! Roster spreadsheet parser and normalizer.
//!
//! Turns a tabular `.xlsx` file into a validated, deduplicated
//! [`Snapshot`](rollcall_core::Snapshot) plus per-pass counters. Reading is
//! lenient by design: bad dates pass through for downstream validation to
//! reject, rows without an admission number are skipped, and duplicate
//! admission numbers keep the first occurrence in file order.

pub mod reader;

pub use reader::{read_snapshot, ParseCounters, ParseOutcome, SheetError};
