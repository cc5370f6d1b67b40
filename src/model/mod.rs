//! Persisted readmission pipeline
//!
//! [`ReadmissionPipeline`] bundles everything inference needs into one
//! artifact: the serving manifest, the lookup tables captured at training
//! time, the fitted transform, and the booster. Loading the artifact is
//! sufficient to score raw encounter records; no side files are consulted.

mod manifest;

pub use manifest::{ChapterRange, Manifest, MANIFEST_SCHEMA_VERSION};

use crate::boost::GradientBoostedTrees;
use crate::data::{Cell, Frame, Lookups};
use crate::features::enrich_and_clean;
use crate::preprocess::{FittedTransform, PreprocessError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Value filled in for an absent medication column at serving time
const MEDICATION_DEFAULT: &str = "No";

/// Errors from loading, saving, or applying a pipeline
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Input is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Cannot score an empty input")]
    EmptyInput,

    #[error(
        "Unsupported artifact schema version {found} (this build reads version {supported})"
    )]
    SchemaVersion { found: u32, supported: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<PreprocessError> for ModelError {
    fn from(err: PreprocessError) -> Self {
        match err {
            PreprocessError::MissingColumns(cols) => ModelError::MissingColumns(cols),
            PreprocessError::EmptyFrame => ModelError::EmptyInput,
        }
    }
}

/// Result alias for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// A fully fitted scoring pipeline, serializable as one JSON artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadmissionPipeline {
    pub manifest: Manifest,
    pub lookups: Lookups,
    pub transform: FittedTransform,
    pub booster: GradientBoostedTrees,
}

impl ReadmissionPipeline {
    /// Score raw encounter rows; one probability in `[0, 1]` per input row.
    ///
    /// Medication columns listed in the manifest default to `"No"` when the
    /// input omits them. Any other missing raw column is a hard schema
    /// error carrying every absent name.
    pub fn predict(&self, frame: &Frame) -> Result<Vec<f64>> {
        if frame.height() == 0 {
            return Err(ModelError::EmptyInput);
        }

        let mut input = frame.clone();
        for name in &self.manifest.defaultable_columns {
            if !input.has_column(name) {
                let filler = vec![Cell::Str(MEDICATION_DEFAULT.to_string()); input.height()];
                // Absence was just checked; heights match the frame.
                let _ = input.push_column(name.clone(), filler);
            }
        }

        let missing: Vec<String> = self
            .manifest
            .raw_columns
            .iter()
            .filter(|name| !input.has_column(name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ModelError::MissingColumns(missing));
        }

        let enriched = enrich_and_clean(&input, &self.lookups);
        let matrix = self.transform.transform(&enriched)?;
        Ok(self.booster.predict_proba(&matrix))
    }

    /// Write the pipeline as pretty-printed JSON, creating parent
    /// directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load a pipeline artifact, rejecting unknown schema versions
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let pipeline: Self = serde_json::from_str(&json)?;
        if pipeline.manifest.schema_version != MANIFEST_SCHEMA_VERSION {
            return Err(ModelError::SchemaVersion {
                found: pipeline.manifest.schema_version,
                supported: MANIFEST_SCHEMA_VERSION,
            });
        }
        Ok(pipeline)
    }
}
