//! Tabular data model
//!
//! A small column-oriented frame for patient-encounter records. Every
//! transformation in this crate produces a new [`Frame`]; nothing mutates a
//! frame it did not build. Scalar values are [`Cell`]s: a missing marker, a
//! number, or a string. CSV fields always enter as strings (empty field =
//! missing); numeric coercion is an explicit enrichment step, not a parsing
//! side effect.

mod csv_io;
mod lookup;

pub use csv_io::{read_frame, read_frame_from_reader, write_frame, write_frame_to_writer};
pub use lookup::{LookupTable, Lookups};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Errors from frame construction and CSV IO
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Column height mismatch: column '{column}' has {actual} cells, frame has {expected}")]
    HeightMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for data operations
pub type Result<T> = std::result::Result<T, DataError>;

/// A single scalar value in a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    /// Semantically missing (blank, sentinel token, failed parse)
    Missing,
    /// Numeric value
    Num(f64),
    /// Categorical / free-text value
    Str(String),
}

impl Cell {
    /// Parse a raw CSV field. Blank fields are missing; everything else is a
    /// string until an explicit coercion step says otherwise.
    pub fn from_field(field: &str) -> Self {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            Cell::Missing
        } else {
            Cell::Str(trimmed.to_string())
        }
    }

    /// Render the cell back to a CSV field
    pub fn to_field(&self) -> String {
        match self {
            Cell::Missing => String::new(),
            Cell::Num(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            Cell::Str(s) => s.clone(),
        }
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Numeric view; `None` for missing and string cells
    pub fn as_num(&self) -> Option<f64> {
        match self {
            Cell::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// String view; `None` for missing and numeric cells
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Canonical key for id-based lookups: strings are trimmed, whole
    /// numbers drop the fraction (`1.0` joins against `"1"`).
    pub fn join_key(&self) -> Option<String> {
        match self {
            Cell::Missing => None,
            Cell::Num(n) if n.fract() == 0.0 => Some(format!("{}", *n as i64)),
            Cell::Num(n) => Some(format!("{n}")),
            Cell::Str(s) => Some(s.trim().to_string()),
        }
    }
}

/// Column-oriented table with named, equal-height columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    names: Vec<String>,
    columns: Vec<Vec<Cell>>,
    index: HashMap<String, usize>,
}

impl Frame {
    /// Create an empty frame
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a frame from `(name, cells)` pairs
    pub fn from_columns(columns: Vec<(String, Vec<Cell>)>) -> Result<Self> {
        let mut frame = Self::new();
        for (name, cells) in columns {
            frame.push_column(name, cells)?;
        }
        Ok(frame)
    }

    /// Build a frame from a header and row-major cells
    pub fn from_rows(names: Vec<String>, rows: &[Vec<Cell>]) -> Result<Self> {
        let mut columns: Vec<Vec<Cell>> = vec![Vec::with_capacity(rows.len()); names.len()];
        for row in rows {
            for (i, column) in columns.iter_mut().enumerate() {
                column.push(row.get(i).cloned().unwrap_or(Cell::Missing));
            }
        }
        Self::from_columns(names.into_iter().zip(columns).collect())
    }

    /// Number of rows
    #[must_use]
    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// Number of columns
    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Column names in order
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Cells of a column, if present
    pub fn column(&self, name: &str) -> Option<&[Cell]> {
        self.index.get(name).map(|&i| self.columns[i].as_slice())
    }

    /// Single cell by row index and column name
    pub fn cell(&self, row: usize, name: &str) -> Option<&Cell> {
        self.column(name).and_then(|cells| cells.get(row))
    }

    /// Append a column. Heights must agree once the frame is non-empty.
    pub fn push_column(&mut self, name: impl Into<String>, cells: Vec<Cell>) -> Result<()> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(DataError::DuplicateColumn(name));
        }
        if !self.columns.is_empty() && cells.len() != self.height() {
            return Err(DataError::HeightMismatch {
                column: name,
                expected: self.height(),
                actual: cells.len(),
            });
        }
        self.index.insert(name.clone(), self.columns.len());
        self.names.push(name);
        self.columns.push(cells);
        Ok(())
    }

    /// Replace a column's cells in place, or append when absent
    pub fn set_column(&mut self, name: impl Into<String>, cells: Vec<Cell>) -> Result<()> {
        let name = name.into();
        match self.index.get(&name) {
            Some(&i) => {
                if cells.len() != self.height() {
                    return Err(DataError::HeightMismatch {
                        column: name,
                        expected: self.height(),
                        actual: cells.len(),
                    });
                }
                self.columns[i] = cells;
                Ok(())
            }
            None => self.push_column(name, cells),
        }
    }

    /// Drop a column; returns whether it was present
    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(pos) = self.index.remove(name) else {
            return false;
        };
        self.names.remove(pos);
        self.columns.remove(pos);
        for idx in self.index.values_mut() {
            if *idx > pos {
                *idx -= 1;
            }
        }
        true
    }

    /// New frame with only the given rows, in the given order
    #[must_use]
    pub fn select_rows(&self, rows: &[usize]) -> Frame {
        let columns = self
            .columns
            .iter()
            .map(|cells| {
                rows.iter()
                    .map(|&r| cells.get(r).cloned().unwrap_or(Cell::Missing))
                    .collect()
            })
            .collect();
        Frame {
            names: self.names.clone(),
            columns,
            index: self.index.clone(),
        }
    }

    /// New frame with every cell mapped through `f`
    #[must_use]
    pub fn map_cells(&self, f: impl Fn(&Cell) -> Cell) -> Frame {
        let columns = self
            .columns
            .iter()
            .map(|cells| cells.iter().map(&f).collect())
            .collect();
        Frame {
            names: self.names.clone(),
            columns,
            index: self.index.clone(),
        }
    }

    /// One row as owned cells, in column order
    #[must_use]
    pub fn row(&self, row: usize) -> Vec<Cell> {
        self.columns
            .iter()
            .map(|cells| cells.get(row).cloned().unwrap_or(Cell::Missing))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        Frame::from_columns(vec![
            (
                "a".to_string(),
                vec![Cell::Num(1.0), Cell::Num(2.0), Cell::Missing],
            ),
            (
                "b".to_string(),
                vec![
                    Cell::Str("x".into()),
                    Cell::Missing,
                    Cell::Str("y".into()),
                ],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn cell_from_field_blank_is_missing() {
        assert_eq!(Cell::from_field(""), Cell::Missing);
        assert_eq!(Cell::from_field("   "), Cell::Missing);
        assert_eq!(Cell::from_field(" 42 "), Cell::Str("42".into()));
    }

    #[test]
    fn cell_to_field_round_trip() {
        assert_eq!(Cell::Missing.to_field(), "");
        assert_eq!(Cell::Num(65.0).to_field(), "65");
        assert_eq!(Cell::Num(6.5).to_field(), "6.5");
        assert_eq!(Cell::Str("No".into()).to_field(), "No");
    }

    #[test]
    fn cell_join_key_matches_integer_ids() {
        assert_eq!(Cell::Num(1.0).join_key().as_deref(), Some("1"));
        assert_eq!(Cell::Str(" 1 ".into()).join_key().as_deref(), Some("1"));
        assert_eq!(Cell::Missing.join_key(), None);
    }

    #[test]
    fn frame_shape_and_access() {
        let f = sample();
        assert_eq!(f.height(), 3);
        assert_eq!(f.width(), 2);
        assert_eq!(f.cell(0, "a"), Some(&Cell::Num(1.0)));
        assert_eq!(f.column("c"), None);
    }

    #[test]
    fn frame_rejects_height_mismatch() {
        let mut f = sample();
        let err = f.push_column("c", vec![Cell::Missing]).unwrap_err();
        assert!(matches!(err, DataError::HeightMismatch { .. }));
    }

    #[test]
    fn frame_rejects_duplicate_column() {
        let mut f = sample();
        let err = f
            .push_column("a", vec![Cell::Missing, Cell::Missing, Cell::Missing])
            .unwrap_err();
        assert!(matches!(err, DataError::DuplicateColumn(_)));
    }

    #[test]
    fn frame_drop_column_keeps_index_consistent() {
        let mut f = sample();
        assert!(f.drop_column("a"));
        assert!(!f.drop_column("a"));
        assert_eq!(f.width(), 1);
        assert_eq!(f.cell(2, "b"), Some(&Cell::Str("y".into())));
    }

    #[test]
    fn frame_select_rows_reorders() {
        let f = sample();
        let g = f.select_rows(&[2, 0]);
        assert_eq!(g.height(), 2);
        assert_eq!(g.cell(0, "b"), Some(&Cell::Str("y".into())));
        assert_eq!(g.cell(1, "a"), Some(&Cell::Num(1.0)));
    }

    #[test]
    fn frame_map_cells_does_not_mutate_input() {
        let f = sample();
        let g = f.map_cells(|c| match c {
            Cell::Num(n) => Cell::Num(n * 2.0),
            other => other.clone(),
        });
        assert_eq!(f.cell(0, "a"), Some(&Cell::Num(1.0)));
        assert_eq!(g.cell(0, "a"), Some(&Cell::Num(2.0)));
    }
}
