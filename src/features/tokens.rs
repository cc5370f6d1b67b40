//! Special-token and missing-value normalization
//!
//! The source dataset encodes "missing" several ways (`?`, `NULL`,
//! `Not Available`) and uses `None`/`No` as real categorical levels for the
//! lab-result and medication columns. Those two must survive normalization
//! as canonical strings rather than being erased as missing.

use crate::data::Cell;

/// Sentinel tokens that mean "missing"
const MISSING_TOKENS: [&str; 3] = ["?", "NULL", "Not Available"];

/// Normalize one cell. Total and deterministic; never fails.
///
/// - blank / sentinel tokens → [`Cell::Missing`]
/// - case-insensitive `none` → literal `"None"`, `no` → `"No"`
/// - everything else: trimmed string or the numeric value unchanged
#[must_use]
pub fn clean_special_token(cell: &Cell) -> Cell {
    let Cell::Str(raw) = cell else {
        return cell.clone();
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() || MISSING_TOKENS.contains(&trimmed) {
        return Cell::Missing;
    }
    if trimmed.eq_ignore_ascii_case("none") {
        return Cell::Str("None".to_string());
    }
    if trimmed.eq_ignore_ascii_case("no") {
        return Cell::Str("No".to_string());
    }
    Cell::Str(trimmed.to_string())
}
