//! Fitted preprocessing transform
//!
//! Splits a cleaned frame's columns into numeric and categorical by dtype
//! and fits a two-branch transform: numeric columns are median-imputed then
//! standardized; categorical columns are mode-imputed then one-hot encoded
//! with a fixed, sorted category order. Categories unseen at transform time
//! map to an all-zero indicator block instead of failing. The fitted state
//! serializes with the model so inference reproduces the exact feature
//! order and value ranges.

use crate::data::{Cell, Frame};
use serde::{Deserialize, Serialize};

/// Errors from fitting or applying the transform
#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    #[error("Cannot fit on an empty frame")]
    EmptyFrame,

    #[error("Missing expected columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Result alias for preprocessing operations
pub type Result<T> = std::result::Result<T, PreprocessError>;

/// Dense row-major feature matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f32>,
}

impl Matrix {
    /// One row as a slice
    #[must_use]
    pub fn row(&self, r: usize) -> &[f32] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }
}

/// Fitted state of one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub median: f64,
    pub mean: f64,
    pub std: f64,
}

/// Fitted state of one categorical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalStats {
    /// Most frequent training value, used to impute missing cells
    pub mode: String,
    /// Sorted category levels; indicator order is fixed by this list
    pub categories: Vec<String>,
}

/// The fitted two-branch transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedTransform {
    pub numeric: Vec<(String, NumericStats)>,
    pub categorical: Vec<(String, CategoricalStats)>,
}

impl FittedTransform {
    /// Fit on a training frame. Column dtype is decided by content: a
    /// column with at least one string cell is categorical, everything
    /// else (numeric or all-missing) is numeric.
    pub fn fit(frame: &Frame) -> Result<Self> {
        if frame.height() == 0 || frame.width() == 0 {
            return Err(PreprocessError::EmptyFrame);
        }

        let mut numeric = Vec::new();
        let mut categorical = Vec::new();

        for name in frame.names() {
            let cells = frame.column(name).unwrap_or(&[]);
            if cells.iter().any(|c| matches!(c, Cell::Str(_))) {
                categorical.push((name.clone(), fit_categorical(cells)));
            } else {
                numeric.push((name.clone(), fit_numeric(cells)));
            }
        }

        Ok(Self {
            numeric,
            categorical,
        })
    }

    /// Names of the expected input columns, numeric first
    #[must_use]
    pub fn input_columns(&self) -> Vec<String> {
        self.numeric
            .iter()
            .map(|(n, _)| n.clone())
            .chain(self.categorical.iter().map(|(n, _)| n.clone()))
            .collect()
    }

    /// Output feature names, in matrix column order
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.numeric.iter().map(|(n, _)| n.clone()).collect();
        for (name, stats) in &self.categorical {
            for category in &stats.categories {
                names.push(format!("{name}={category}"));
            }
        }
        names
    }

    /// Width of the produced matrix
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|(_, s)| s.categories.len())
                .sum::<usize>()
    }

    /// Apply the fitted transform. A frame missing any expected column is
    /// a hard schema error carrying every absent name.
    pub fn transform(&self, frame: &Frame) -> Result<Matrix> {
        let missing: Vec<String> = self
            .input_columns()
            .into_iter()
            .filter(|name| !frame.has_column(name))
            .collect();
        if !missing.is_empty() {
            return Err(PreprocessError::MissingColumns(missing));
        }

        let rows = frame.height();
        let cols = self.n_features();
        let mut data = vec![0.0f32; rows * cols];

        let mut col_offset = 0;
        for (name, stats) in &self.numeric {
            // presence checked above
            let cells = frame.column(name).unwrap_or(&[]);
            for (r, cell) in cells.iter().enumerate() {
                let raw = cell.as_num().unwrap_or(stats.median);
                let scaled = if stats.std > f64::EPSILON {
                    (raw - stats.mean) / stats.std
                } else {
                    0.0
                };
                data[r * cols + col_offset] = scaled as f32;
            }
            col_offset += 1;
        }

        for (name, stats) in &self.categorical {
            let cells = frame.column(name).unwrap_or(&[]);
            for (r, cell) in cells.iter().enumerate() {
                let value = match cell {
                    Cell::Missing => stats.mode.as_str(),
                    Cell::Num(n) => {
                        // Numeric values in a categorical column match on
                        // their rendered form; otherwise all-zero.
                        let rendered = Cell::Num(*n).to_field();
                        if let Ok(idx) = stats.categories.binary_search(&rendered) {
                            data[r * cols + col_offset + idx] = 1.0;
                        }
                        continue;
                    }
                    Cell::Str(s) => s.as_str(),
                };
                // Unseen category: leave the whole block at zero.
                if let Ok(idx) = stats.categories.binary_search_by(|c| c.as_str().cmp(value)) {
                    data[r * cols + col_offset + idx] = 1.0;
                }
            }
            col_offset += stats.categories.len();
        }

        Ok(Matrix { rows, cols, data })
    }
}

fn fit_numeric(cells: &[Cell]) -> NumericStats {
    let mut present: Vec<f64> = cells.iter().filter_map(Cell::as_num).collect();
    let median = if present.is_empty() {
        0.0
    } else {
        present.sort_by(f64::total_cmp);
        let mid = present.len() / 2;
        if present.len() % 2 == 0 {
            (present[mid - 1] + present[mid]) / 2.0
        } else {
            present[mid]
        }
    };

    // The scaler sees the imputed column, matching a pipeline that imputes
    // before standardizing.
    let imputed: Vec<f64> = cells
        .iter()
        .map(|c| c.as_num().unwrap_or(median))
        .collect();
    let n = imputed.len() as f64;
    let mean = imputed.iter().sum::<f64>() / n;
    let variance = imputed.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

    NumericStats {
        median,
        mean,
        std: variance.sqrt(),
    }
}

fn fit_categorical(cells: &[Cell]) -> CategoricalStats {
    use std::collections::BTreeMap;

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for cell in cells {
        let value = match cell {
            Cell::Str(s) => s.clone(),
            Cell::Num(n) => Cell::Num(*n).to_field(),
            Cell::Missing => continue,
        };
        *counts.entry(value).or_insert(0) += 1;
    }

    // Ties break toward the smallest value, keeping the mode deterministic.
    let mode = counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(value, _)| value.clone())
        .unwrap_or_default();
    let categories: Vec<String> = counts.into_keys().collect();

    CategoricalStats { mode, categories }
}
