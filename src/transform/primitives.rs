//! Primitive cell decoders shared by every record schema (C1).
//!
//! Every decoder treats an empty or whitespace-only cell as "absent" rather
//! than as a parse failure: the Federal Revenue CSVs use empty cells for
//! unset fields far more often than any sentinel value, and invariant 3
//! (`SPEC_FULL.md` §3) requires that absence never masquerade as a zero.

use chrono::NaiveDate;

use super::DecodeError;

/// Parses a decimal integer cell, treating leading zeros as decimal digits.
///
/// Returns `Ok(None)` for an empty or whitespace-only cell, `Err` for a
/// non-empty cell that isn't a valid integer.
pub fn to_int(field: &'static str, raw: &str) -> Result<Option<i64>, DecodeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<i64>()
        .map(Some)
        .map_err(|e| DecodeError::new(field, raw, e))
}

/// Parses a locale-formatted decimal cell (comma as the fractional separator,
/// matching the Federal Revenue's export convention for `capital_social`).
pub fn to_float(field: &'static str, raw: &str) -> Result<Option<f64>, DecodeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let normalized = trimmed.replace(',', ".");
    normalized
        .parse::<f64>()
        .map(Some)
        .map_err(|e| DecodeError::new(field, raw, e))
}

/// Parses a `YYYYMMDD` cell into a calendar date.
///
/// `"00000000"` and the empty cell both decode to `Ok(None)` — the source
/// uses the all-zero date as its own "unset" sentinel alongside blank cells.
pub fn to_date(field: &'static str, raw: &str) -> Result<Option<NaiveDate>, DecodeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "00000000" {
        return Ok(None);
    }
    if trimmed.len() != 8 {
        return Err(DecodeError::new(
            field,
            raw,
            format!("expected an 8-digit YYYYMMDD date, got {} characters", trimmed.len()),
        ));
    }
    let year: i32 = trimmed[0..4]
        .parse()
        .map_err(|e: std::num::ParseIntError| DecodeError::new(field, raw, e))?;
    let month: u32 = trimmed[4..6]
        .parse()
        .map_err(|e: std::num::ParseIntError| DecodeError::new(field, raw, e))?;
    let day: u32 = trimmed[6..8]
        .parse()
        .map_err(|e: std::num::ParseIntError| DecodeError::new(field, raw, e))?;
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| DecodeError::new(field, raw, "not a valid calendar date"))
}

/// Strips the CSV dialect's surrounding quotes and trims whitespace.
///
/// This never fails: a cell that is already unquoted passes through
/// unchanged.
pub fn clean_string(raw: &str) -> String {
    raw.trim().trim_matches('"').trim().to_string()
}
