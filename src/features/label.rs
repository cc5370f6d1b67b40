//! Binary 30-day readmission target
//!
//! The raw `readmitted` column has three classes: `<30`, `>30`, `NO`.
//! The modeling target collapses them to a binary outcome: readmitted
//! within 30 days or not.

use crate::data::Cell;

/// Name of the raw label column in the source dataset
pub const RAW_LABEL_COLUMN: &str = "readmitted";

/// Name of the derived binary target column
pub const TARGET_COLUMN: &str = "readmitted_30";

/// `"<30"` → 1; `">30"`, `"NO"`, and anything else (including non-string
/// cells) → 0. Total; never fails.
#[must_use]
pub fn map_readmitted(cell: &Cell) -> u8 {
    match cell.as_str() {
        Some(label) if label.trim().to_ascii_uppercase() == "<30" => 1,
        _ => 0,
    }
}
