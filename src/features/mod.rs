//! Feature engineering for patient-encounter records
//!
//! The one piece of logic that must run byte-identically at training and
//! inference time. [`enrich_and_clean`] turns a raw encounter frame into a
//! model-ready frame through a fixed sequence of pure, total steps; parse
//! failures degrade to missing values and never abort a batch.

mod age;
mod icd;
mod label;
mod tokens;

pub use age::{age_midpoint, age_midpoint_cell};
pub use icd::{icd_chapter_cell, IcdChapter, CHAPTER_RANGES};
pub use label::{map_readmitted, RAW_LABEL_COLUMN, TARGET_COLUMN};
pub use tokens::clean_special_token;

use crate::data::{Cell, Frame, Lookups};

/// Columns coerced to numeric during enrichment; unparsable values become
/// missing rather than dropping the row
pub const NUMERIC_LIKE_COLUMNS: &[&str] = &[
    "time_in_hospital",
    "num_lab_procedures",
    "num_procedures",
    "num_medications",
    "number_outpatient",
    "number_emergency",
    "number_inpatient",
    "number_diagnoses",
    "weight",
];

/// Identifier, free-text, and leak-prone columns dropped once their derived
/// replacements exist
pub const DROPPED_COLUMNS: &[&str] = &[
    "encounter_id",
    "patient_nbr",
    "payer_code",
    "medical_specialty",
    "age",
    "diag_1",
    "diag_2",
    "diag_3",
];

/// Raw diagnosis-code columns, each replaced by a `*_chapter` column
pub const DIAGNOSIS_COLUMNS: &[&str] = &["diag_1", "diag_2", "diag_3"];

/// Medication dosage-change columns, all taking `{No, Steady, Up, Down}`.
/// Absent at serving time they default to `"No"`.
pub const MEDICATION_COLUMNS: &[&str] = &[
    "metformin",
    "repaglinide",
    "nateglinide",
    "chlorpropamide",
    "glimepiride",
    "acetohexamide",
    "glipizide",
    "glyburide",
    "tolbutamide",
    "pioglitazone",
    "rosiglitazone",
    "acarbose",
    "miglitol",
    "troglitazone",
    "tolazamide",
    "examide",
    "citoglipton",
    "insulin",
    "glyburide-metformin",
    "glipizide-metformin",
    "glimepiride-pioglitazone",
    "metformin-rosiglitazone",
    "metformin-pioglitazone",
];

/// Id columns and the description columns their lookups append
const DESC_JOINS: &[(&str, &str)] = &[
    ("admission_type_id", "admission_type_desc"),
    ("discharge_disposition_id", "discharge_disposition_desc"),
    ("admission_source_id", "admission_source_desc"),
];

/// Produce a model-ready frame from a raw encounter frame.
///
/// Steps, in fixed order:
/// 1. normalize every cell ([`clean_special_token`])
/// 2. left-join the supplied id → description lookups, appending `*_desc`
///    columns; an unmapped or missing id leaves the description missing,
///    and joined descriptions go through the same normalization as step 1
/// 3. `age` bucket → `age_years` midpoint
/// 4. `diag_1..3` → `diag_k_chapter`
/// 5. coerce [`NUMERIC_LIKE_COLUMNS`] to numeric
/// 6. drop [`DROPPED_COLUMNS`]
///
/// The function never mutates its input, and applying it twice with the
/// same lookups yields the same frame as applying it once: derived columns
/// are only computed when their source column is present, and a join is
/// skipped when its description column already exists.
#[must_use]
pub fn enrich_and_clean(frame: &Frame, lookups: &Lookups) -> Frame {
    let mut out = frame.map_cells(clean_special_token);

    let tables = [
        &lookups.admission_type,
        &lookups.discharge_disposition,
        &lookups.admission_source,
    ];
    for (&(id_column, desc_column), table) in DESC_JOINS.iter().zip(tables) {
        let Some(table) = table else { continue };
        if out.has_column(desc_column) {
            continue;
        }
        let Some(ids) = out.column(id_column) else {
            continue;
        };
        let descriptions: Vec<Cell> = ids
            .iter()
            .map(|id| {
                // The real side tables carry sentinel descriptions
                // ("Not Available", "NULL"); normalize them like any
                // other cell so a second pass sees the same frame.
                table.describe(id).map_or(Cell::Missing, |d| {
                    clean_special_token(&Cell::Str(d.to_string()))
                })
            })
            .collect();
        // Column existence was checked above; heights match by construction.
        let _ = out.push_column(desc_column, descriptions);
    }

    if let Some(ages) = out.column("age") {
        let midpoints: Vec<Cell> = ages.iter().map(age_midpoint_cell).collect();
        let _ = out.set_column("age_years", midpoints);
    }

    for &diag in DIAGNOSIS_COLUMNS {
        if let Some(codes) = out.column(diag) {
            let chapters: Vec<Cell> = codes.iter().map(icd_chapter_cell).collect();
            let _ = out.set_column(format!("{diag}_chapter"), chapters);
        }
    }

    for &name in NUMERIC_LIKE_COLUMNS {
        if let Some(cells) = out.column(name) {
            let coerced: Vec<Cell> = cells.iter().map(coerce_numeric).collect();
            let _ = out.set_column(name, coerced);
        }
    }

    for &name in DROPPED_COLUMNS {
        out.drop_column(name);
    }

    out
}

fn coerce_numeric(cell: &Cell) -> Cell {
    match cell {
        Cell::Num(n) => Cell::Num(*n),
        Cell::Str(s) => s.trim().parse::<f64>().map_or(Cell::Missing, Cell::Num),
        Cell::Missing => Cell::Missing,
    }
}
