//! Id → description lookup tables
//!
//! The source dataset ships three side tables mapping admission-type,
//! discharge-disposition, and admission-source ids to human-readable
//! descriptions. Each is a two-column CSV: the id column and `description`.

use super::{read_frame, Cell, DataError, Frame, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A single id → description table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupTable {
    /// Name of the id column this table joins on
    pub id_column: String,
    /// Trimmed id → description
    pub entries: BTreeMap<String, String>,
}

impl LookupTable {
    /// Load from a two-column CSV. Rows with a blank id or description are
    /// skipped, matching how the original side tables are consumed.
    pub fn from_csv(path: impl AsRef<Path>, id_column: &str) -> Result<Self> {
        let frame = read_frame(path)?;
        Self::from_frame(&frame, id_column)
    }

    /// Build from an already-parsed frame
    pub fn from_frame(frame: &Frame, id_column: &str) -> Result<Self> {
        let ids = frame
            .column(id_column)
            .ok_or_else(|| DataError::UnknownColumn(id_column.to_string()))?;
        let descriptions = frame
            .column("description")
            .ok_or_else(|| DataError::UnknownColumn("description".to_string()))?;

        let mut entries = BTreeMap::new();
        for (id, desc) in ids.iter().zip(descriptions) {
            if let (Some(key), Some(text)) = (id.join_key(), desc.as_str()) {
                if !text.trim().is_empty() {
                    entries.insert(key, text.trim().to_string());
                }
            }
        }

        Ok(Self {
            id_column: id_column.to_string(),
            entries,
        })
    }

    /// Description for an id cell; `None` when the id is missing or unmapped
    pub fn describe(&self, id: &Cell) -> Option<&str> {
        id.join_key()
            .and_then(|key| self.entries.get(&key))
            .map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The three optional side tables used during enrichment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lookups {
    pub admission_type: Option<LookupTable>,
    pub discharge_disposition: Option<LookupTable>,
    pub admission_source: Option<LookupTable>,
}

impl Lookups {
    /// No side tables; enrichment skips the join step
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Load whichever side-table paths were supplied
    pub fn from_paths(
        admission_type: Option<&Path>,
        discharge_disposition: Option<&Path>,
        admission_source: Option<&Path>,
    ) -> Result<Self> {
        Ok(Self {
            admission_type: admission_type
                .map(|p| LookupTable::from_csv(p, "admission_type_id"))
                .transpose()?,
            discharge_disposition: discharge_disposition
                .map(|p| LookupTable::from_csv(p, "discharge_disposition_id"))
                .transpose()?,
            admission_source: admission_source
                .map(|p| LookupTable::from_csv(p, "admission_source_id"))
                .transpose()?,
        })
    }
}
