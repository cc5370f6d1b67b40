//! Typed pipeline manifest
//!
//! Every persisted pipeline carries an explicit, versioned manifest of its
//! serving contract: the raw columns it expects, which of them may be
//! defaulted, the fitted feature order, the encoder categories, and the
//! chapter table in force when it was trained. Debugging reads this file
//! instead of introspecting the fitted objects.

use crate::features::{CHAPTER_RANGES, MEDICATION_COLUMNS};
use crate::preprocess::FittedTransform;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current manifest schema version
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

/// One numeric chapter range, serialized for the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRange {
    pub chapter: String,
    pub lo: u32,
    pub hi: u32,
}

/// Serving contract of a fitted pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    /// Seed used for the split and the booster
    pub seed: u64,
    /// Raw input columns the pipeline expects before enrichment
    pub raw_columns: Vec<String>,
    /// Raw columns that default to `"No"` when absent (medications)
    pub defaultable_columns: Vec<String>,
    /// Cleaned columns feeding the numeric branch
    pub numeric_columns: Vec<String>,
    /// Cleaned columns feeding the categorical branch
    pub categorical_columns: Vec<String>,
    /// Final feature order of the transform output
    pub feature_names: Vec<String>,
    /// One-hot category levels per categorical column
    pub categories: BTreeMap<String, Vec<String>>,
    /// ICD chapter table in force at training time
    pub chapter_table: Vec<ChapterRange>,
}

impl Manifest {
    /// Build a manifest from the raw training columns and the fitted
    /// transform. The defaultable set is the medication columns that
    /// actually appear in the raw schema.
    #[must_use]
    pub fn from_fitted(raw_columns: &[String], transform: &FittedTransform, seed: u64) -> Self {
        let defaultable_columns = raw_columns
            .iter()
            .filter(|c| MEDICATION_COLUMNS.contains(&c.as_str()))
            .cloned()
            .collect();

        Self {
            schema_version: MANIFEST_SCHEMA_VERSION,
            created_at: Utc::now(),
            seed,
            raw_columns: raw_columns.to_vec(),
            defaultable_columns,
            numeric_columns: transform.numeric.iter().map(|(n, _)| n.clone()).collect(),
            categorical_columns: transform
                .categorical
                .iter()
                .map(|(n, _)| n.clone())
                .collect(),
            feature_names: transform.feature_names(),
            categories: transform
                .categorical
                .iter()
                .map(|(n, s)| (n.clone(), s.categories.clone()))
                .collect(),
            chapter_table: CHAPTER_RANGES
                .iter()
                .map(|&(chapter, lo, hi)| ChapterRange {
                    chapter: chapter.as_str().to_string(),
                    lo,
                    hi,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Cell, Frame};

    fn fitted() -> (Vec<String>, FittedTransform) {
        let frame = Frame::from_columns(vec![
            ("age_years".to_string(), vec![Cell::Num(65.0)]),
            ("insulin".to_string(), vec![Cell::Str("No".into())]),
        ])
        .unwrap();
        let transform = FittedTransform::fit(&frame).unwrap();
        let raw = vec![
            "age".to_string(),
            "insulin".to_string(),
            "diag_1".to_string(),
        ];
        (raw, transform)
    }

    #[test]
    fn manifest_captures_the_serving_contract() {
        let (raw, transform) = fitted();
        let manifest = Manifest::from_fitted(&raw, &transform, 42);

        assert_eq!(manifest.schema_version, MANIFEST_SCHEMA_VERSION);
        assert_eq!(manifest.defaultable_columns, vec!["insulin".to_string()]);
        assert_eq!(manifest.numeric_columns, vec!["age_years".to_string()]);
        assert_eq!(
            manifest.categories.get("insulin"),
            Some(&vec!["No".to_string()])
        );
        assert_eq!(manifest.chapter_table.len(), CHAPTER_RANGES.len());
        assert_eq!(manifest.chapter_table[0].chapter, "infectious");
    }

    #[test]
    fn serde_round_trip() {
        let (raw, transform) = fitted();
        let manifest = Manifest::from_fitted(&raw, &transform, 7);
        let json = serde_json::to_string_pretty(&manifest).unwrap();
        let back: Manifest = serde_json::from_str(&json).unwrap();
        assert_eq!(manifest, back);
    }
}
