//! ICD-9 diagnosis code → chapter bucketing
//!
//! Diagnosis codes are numeric strings (`"250.03"`) or supplemental
//! `V`/`E`-prefixed codes. Each maps deterministically to a coarse chapter:
//! the integer part before any decimal point is located in a fixed,
//! non-overlapping range table; first matching range wins.

use crate::data::Cell;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse ICD-9 disease chapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IcdChapter {
    Infectious,
    Neoplasms,
    EndocrineMetabolic,
    Blood,
    Mental,
    Nervous,
    Circulatory,
    Respiratory,
    Digestive,
    Genitourinary,
    Pregnancy,
    Skin,
    Musculoskeletal,
    Congenital,
    Perinatal,
    IllDefined,
    Injury,
    SupplementalV,
    SupplementalE,
    /// Parseable number outside every chapter range
    Other,
    /// Blank or unparsable code
    Unknown,
}

/// Closed numeric ranges for the numeric chapters, in lookup order
pub const CHAPTER_RANGES: &[(IcdChapter, u32, u32)] = &[
    (IcdChapter::Infectious, 1, 139),
    (IcdChapter::Neoplasms, 140, 239),
    (IcdChapter::EndocrineMetabolic, 240, 279),
    (IcdChapter::Blood, 280, 289),
    (IcdChapter::Mental, 290, 319),
    (IcdChapter::Nervous, 320, 389),
    (IcdChapter::Circulatory, 390, 459),
    (IcdChapter::Respiratory, 460, 519),
    (IcdChapter::Digestive, 520, 579),
    (IcdChapter::Genitourinary, 580, 629),
    (IcdChapter::Pregnancy, 630, 679),
    (IcdChapter::Skin, 680, 709),
    (IcdChapter::Musculoskeletal, 710, 739),
    (IcdChapter::Congenital, 740, 759),
    (IcdChapter::Perinatal, 760, 779),
    (IcdChapter::IllDefined, 780, 799),
    (IcdChapter::Injury, 800, 999),
];

impl IcdChapter {
    /// Classify a raw diagnosis-code string. Total; never fails.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        let code = code.trim();
        if code.is_empty() || code == "?" {
            return IcdChapter::Unknown;
        }
        match code.as_bytes()[0] {
            b'V' | b'v' => return IcdChapter::SupplementalV,
            b'E' | b'e' => return IcdChapter::SupplementalE,
            _ => {}
        }
        let integer_part = code.split('.').next().unwrap_or(code);
        let Ok(value) = integer_part.parse::<f64>() else {
            return IcdChapter::Unknown;
        };
        for &(chapter, lo, hi) in CHAPTER_RANGES {
            if value >= f64::from(lo) && value <= f64::from(hi) {
                return chapter;
            }
        }
        IcdChapter::Other
    }

    /// Stable snake_case name used in derived categorical columns
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            IcdChapter::Infectious => "infectious",
            IcdChapter::Neoplasms => "neoplasms",
            IcdChapter::EndocrineMetabolic => "endocrine_metabolic",
            IcdChapter::Blood => "blood",
            IcdChapter::Mental => "mental",
            IcdChapter::Nervous => "nervous",
            IcdChapter::Circulatory => "circulatory",
            IcdChapter::Respiratory => "respiratory",
            IcdChapter::Digestive => "digestive",
            IcdChapter::Genitourinary => "genitourinary",
            IcdChapter::Pregnancy => "pregnancy",
            IcdChapter::Skin => "skin",
            IcdChapter::Musculoskeletal => "musculoskeletal",
            IcdChapter::Congenital => "congenital",
            IcdChapter::Perinatal => "perinatal",
            IcdChapter::IllDefined => "ill_defined",
            IcdChapter::Injury => "injury",
            IcdChapter::SupplementalV => "supplemental_v",
            IcdChapter::SupplementalE => "supplemental_e",
            IcdChapter::Other => "other",
            IcdChapter::Unknown => "unknown",
        }
    }
}

impl fmt::Display for IcdChapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cell-level wrapper: missing and numeric cells classify as `Unknown`
/// through their string form, matching the training-time behavior.
#[must_use]
pub fn icd_chapter_cell(cell: &Cell) -> Cell {
    let chapter = match cell {
        Cell::Missing => IcdChapter::Unknown,
        Cell::Num(n) => IcdChapter::from_code(&Cell::Num(*n).to_field()),
        Cell::Str(s) => IcdChapter::from_code(s),
    };
    Cell::Str(chapter.as_str().to_string())
}
