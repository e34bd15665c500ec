//! Best-effort date normalization for roster spreadsheets.
//!
//! Source files carry join dates as Excel serial-day numbers, `M/D/YYYY`
//! strings, or already-ISO `YYYY-MM-DD` strings. [`normalize`] maps all
//! three to `YYYY-MM-DD` and passes anything else through unchanged —
//! a bad date never aborts a parse; downstream record validation rejects
//! it instead.

use chrono::{Duration, NaiveDate};

/// Excel's serial day 0 (the 1900 date system, with its leap-year quirk
/// already folded in).
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Highest serial number accepted as a date (9999-12-31).
const MAX_SERIAL: f64 = 2_958_465.0;

/// Normalize a raw date value to `YYYY-MM-DD` when possible.
///
/// Accepted inputs, tried in order:
/// 1. `YYYY-MM-DD` (returned as-is once validated),
/// 2. an Excel serial-day number,
/// 3. `M/D/YYYY`.
///
/// Anything else is returned unchanged; callers log such values as
/// unrecognized and leave rejection to record validation.
pub fn normalize(raw: &str) -> String {
    let value = raw.trim();
    if value.is_empty() {
        return String::new();
    }

    if is_iso_date(value) {
        return value.to_string();
    }

    if let Ok(serial) = value.parse::<f64>() {
        if let Some(date) = serial_to_date(serial) {
            return date.format("%Y-%m-%d").to_string();
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%m/%d/%Y") {
        return date.format("%Y-%m-%d").to_string();
    }

    raw.to_string()
}

/// Strict `YYYY-MM-DD` shape check: ten characters, dashes in the right
/// places, and a real calendar date.
pub fn is_iso_date(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return false;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

/// Convert an Excel serial-day number to a calendar date.
///
/// Fractional parts (time of day) are truncated. Returns `None` for
/// non-positive or implausibly large serials.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    let (y, m, d) = EXCEL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_number_normalizes() {
        assert_eq!(normalize("44562"), "2022-01-01");
    }

    #[test]
    fn serial_with_time_fraction_truncates() {
        assert_eq!(normalize("44562.75"), "2022-01-01");
    }

    #[test]
    fn slash_format_normalizes() {
        assert_eq!(normalize("2/2/2020"), "2020-02-02");
        assert_eq!(normalize("12/31/2019"), "2019-12-31");
    }

    #[test]
    fn iso_passes_through() {
        assert_eq!(normalize("2020-02-02"), "2020-02-02");
    }

    #[test]
    fn unrecognized_passes_through_unchanged() {
        assert_eq!(normalize("next Tuesday"), "next Tuesday");
        assert_eq!(normalize("02-02-2020"), "02-02-2020");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn iso_shape_check_is_strict() {
        assert!(is_iso_date("2020-02-02"));
        assert!(!is_iso_date("2020-2-2"));
        assert!(!is_iso_date("2020-13-01"));
        assert!(!is_iso_date("2020/02/02"));
        assert!(!is_iso_date("next Tuesday"));
    }

    #[test]
    fn serial_bounds_are_enforced() {
        assert!(serial_to_date(0.0).is_none());
        assert!(serial_to_date(-5.0).is_none());
        assert!(serial_to_date(3_000_000.0).is_none());
        assert_eq!(
            serial_to_date(1.0),
            NaiveDate::from_ymd_opt(1899, 12, 31)
        );
    }
}
