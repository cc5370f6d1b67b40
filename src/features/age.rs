//! Age-bucket midpoints
//!
//! The dataset publishes age as ten-year interval strings like `[60-70)`.
//! Modeling uses the interval midpoint; anything that does not match the
//! pattern degrades to missing.

use crate::data::Cell;
use regex::Regex;
use std::sync::OnceLock;

fn bucket_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\[(\d+)-(\d+)\)$").expect("valid age-bucket pattern"))
}

/// Midpoint of an age-bucket string, e.g. `"[60-70)"` → `65.0`
///
/// Non-matching input yields `None`, never an error.
#[must_use]
pub fn age_midpoint(bucket: &str) -> Option<f64> {
    let caps = bucket_pattern().captures(bucket.trim())?;
    let lo: f64 = caps[1].parse().ok()?;
    let hi: f64 = caps[2].parse().ok()?;
    Some((lo + hi) / 2.0)
}

/// Cell-level wrapper: string buckets map to their midpoint, everything
/// else (missing, numeric, malformed) propagates as missing.
#[must_use]
pub fn age_midpoint_cell(cell: &Cell) -> Cell {
    cell.as_str()
        .and_then(age_midpoint)
        .map_or(Cell::Missing, Cell::Num)
}
