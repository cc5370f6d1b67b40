//! Training driver
//!
//! [`run_training`] is the one entry point the CLI and tests call: it reads
//! the raw encounter CSV, derives the label, enriches, splits, fits the
//! transform and booster on the training fold, scores the held-out fold,
//! logs the run with its curve artifacts, and optionally registers the
//! resulting pipeline under a model name.

mod split;

pub use split::stratified_split;

use crate::boost::{BoostError, BoostParams, GradientBoostedTrees};
use crate::data::{read_frame, write_frame, DataError, Lookups};
use crate::eval::{compute_metrics, curve_svg, pr_curve, roc_curve, BinaryMetrics, EvalError};
use crate::features::{enrich_and_clean, map_readmitted, RAW_LABEL_COLUMN, TARGET_COLUMN};
use crate::model::{Manifest, ModelError, ReadmissionPipeline};
use crate::preprocess::{FittedTransform, PreprocessError};
use crate::registry::{FsRegistry, ModelRegistry, ModelVersion, RegistryError};
use crate::tracking::storage::JsonFileBackend;
use crate::tracking::{ExperimentTracker, RunStatus, TrackingError};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default experiment name for training runs
pub const DEFAULT_EXPERIMENT: &str = "hospital-readmission";

/// Errors from the training driver
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error("Training data has no '{RAW_LABEL_COLUMN}' label column")]
    MissingLabelColumn,

    #[error("Validation fold ended up single-class; training set is too small or too skewed")]
    DegenerateValidationFold,

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error(transparent)]
    Boost(#[from] BoostError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Tracking(#[from] TrackingError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for training operations
pub type Result<T> = std::result::Result<T, TrainError>;

/// Everything a training run needs
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Raw encounter CSV with the `readmitted` label column
    pub data: PathBuf,
    /// Optional id → description side-table CSVs
    pub admission_type_csv: Option<PathBuf>,
    pub discharge_disposition_csv: Option<PathBuf>,
    pub admission_source_csv: Option<PathBuf>,
    /// Store root holding runs and the registry
    pub store: PathBuf,
    pub experiment: String,
    pub run_name: Option<String>,
    /// Register the pipeline under this model name after training
    pub register: Option<String>,
    pub params: BoostParams,
    /// Fraction of rows held out per class
    pub validation_fraction: f64,
    /// Also write the enriched training frame here, for inspection
    pub processed_out: Option<PathBuf>,
}

impl TrainOptions {
    pub fn new(data: impl Into<PathBuf>, store: impl Into<PathBuf>) -> Self {
        Self {
            data: data.into(),
            admission_type_csv: None,
            discharge_disposition_csv: None,
            admission_source_csv: None,
            store: store.into(),
            experiment: DEFAULT_EXPERIMENT.to_string(),
            run_name: None,
            register: None,
            params: BoostParams::default(),
            validation_fraction: 0.2,
            processed_out: None,
        }
    }

    #[must_use]
    pub fn with_register(mut self, name: impl Into<String>) -> Self {
        self.register = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_run_name(mut self, name: impl Into<String>) -> Self {
        self.run_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: BoostParams) -> Self {
        self.params = params;
        self
    }
}

/// Outcome of one training run
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub run_id: String,
    pub metrics: BinaryMetrics,
    pub scale_pos_weight: f64,
    pub n_rows: usize,
    pub n_features: usize,
    pub model_path: PathBuf,
    /// Present when the run registered its model
    pub registered: Option<ModelVersion>,
}

/// Run the full training workflow
pub fn run_training(options: &TrainOptions) -> Result<TrainReport> {
    let runs_dir = options.store.join("runs");
    let mut tracker = ExperimentTracker::new(
        options.experiment.clone(),
        JsonFileBackend::new(&runs_dir),
    );
    let run_id = tracker.start_run(options.run_name.as_deref());

    match train_run(options, &mut tracker, &run_id) {
        Ok(report) => {
            tracker.end_run(&run_id, RunStatus::Completed)?;
            Ok(report)
        }
        Err(err) => {
            // best effort: the original error is the one worth surfacing
            let _ = tracker.end_run(&run_id, RunStatus::Failed);
            Err(err)
        }
    }
}

fn train_run(
    options: &TrainOptions,
    tracker: &mut ExperimentTracker<JsonFileBackend>,
    run_id: &str,
) -> Result<TrainReport> {
    let lookups = Lookups::from_paths(
        options.admission_type_csv.as_deref(),
        options.discharge_disposition_csv.as_deref(),
        options.admission_source_csv.as_deref(),
    )?;

    let raw = read_frame(&options.data)?;
    let labels = raw
        .column(RAW_LABEL_COLUMN)
        .ok_or(TrainError::MissingLabelColumn)?;
    let y: Vec<u8> = labels.iter().map(map_readmitted).collect();

    let mut features = raw.clone();
    features.drop_column(RAW_LABEL_COLUMN);
    let raw_columns: Vec<String> = features.names().to_vec();

    let enriched = enrich_and_clean(&features, &lookups);

    if let Some(out) = &options.processed_out {
        let mut processed = enriched.clone();
        let target: Vec<_> = y
            .iter()
            .map(|&v| crate::data::Cell::Num(f64::from(v)))
            .collect();
        processed.set_column(TARGET_COLUMN, target)?;
        write_frame(&processed, out)?;
    }

    let (train_idx, valid_idx) =
        stratified_split(&y, options.validation_fraction, options.params.seed);
    let y_train: Vec<u8> = train_idx.iter().map(|&i| y[i]).collect();
    let y_valid: Vec<u8> = valid_idx.iter().map(|&i| y[i]).collect();

    let train_frame = enriched.select_rows(&train_idx);
    let valid_frame = enriched.select_rows(&valid_idx);

    let transform = FittedTransform::fit(&train_frame)?;
    let x_train = transform.transform(&train_frame)?;
    let x_valid = transform.transform(&valid_frame)?;

    let positives = y_train.iter().filter(|&&v| v == 1).count();
    let negatives = y_train.len() - positives;
    let mut params = options.params.clone();
    params.scale_pos_weight = BoostParams::balanced_pos_weight(positives, negatives);

    log_params(tracker, run_id, &params, options.validation_fraction)?;

    let booster = GradientBoostedTrees::fit(&x_train, &y_train, params.clone())?;
    let scores = booster.predict_proba(&x_valid);

    let metrics = compute_metrics(&y_valid, &scores).map_err(|err| match err {
        EvalError::SingleClass | EvalError::Empty => TrainError::DegenerateValidationFold,
        EvalError::LengthMismatch { .. } => TrainError::DegenerateValidationFold,
    })?;
    tracker.log_metric(run_id, "roc_auc", metrics.roc_auc)?;
    tracker.log_metric(run_id, "pr_auc", metrics.pr_auc)?;

    let artifacts_dir = options.store.join("runs").join(run_id).join("artifacts");
    write_curve_artifacts(tracker, run_id, &artifacts_dir, &y_valid, &scores)?;

    let pipeline = ReadmissionPipeline {
        manifest: Manifest::from_fitted(&raw_columns, &transform, params.seed),
        lookups,
        transform,
        booster,
    };
    let model_path = artifacts_dir.join("model.json");
    pipeline.save(&model_path)?;
    tracker.log_artifact(run_id, model_path.to_string_lossy())?;

    let registered = match &options.register {
        Some(name) => {
            let mut registry = FsRegistry::open(&options.store)?;
            let metric_map = BTreeMap::from([
                ("roc_auc".to_string(), metrics.roc_auc),
                ("pr_auc".to_string(), metrics.pr_auc),
            ]);
            Some(registry.register_model(name, &model_path, run_id, &metric_map)?)
        }
        None => None,
    };

    Ok(TrainReport {
        run_id: run_id.to_string(),
        metrics,
        scale_pos_weight: params.scale_pos_weight,
        n_rows: enriched.height(),
        n_features: pipeline.transform.n_features(),
        model_path,
        registered,
    })
}

fn log_params(
    tracker: &mut ExperimentTracker<JsonFileBackend>,
    run_id: &str,
    params: &BoostParams,
    validation_fraction: f64,
) -> Result<()> {
    tracker.log_param(run_id, "n_trees", params.n_trees)?;
    tracker.log_param(run_id, "max_depth", params.max_depth)?;
    tracker.log_param(run_id, "learning_rate", params.learning_rate)?;
    tracker.log_param(run_id, "subsample", params.subsample)?;
    tracker.log_param(run_id, "colsample", params.colsample)?;
    tracker.log_param(run_id, "lambda", params.lambda)?;
    tracker.log_param(run_id, "min_child_weight", params.min_child_weight)?;
    tracker.log_param(run_id, "scale_pos_weight", params.scale_pos_weight)?;
    tracker.log_param(run_id, "seed", params.seed)?;
    tracker.log_param(run_id, "validation_fraction", validation_fraction)?;
    Ok(())
}

fn write_curve_artifacts(
    tracker: &mut ExperimentTracker<JsonFileBackend>,
    run_id: &str,
    dir: &Path,
    y_valid: &[u8],
    scores: &[f64],
) -> Result<()> {
    fs::create_dir_all(dir)?;

    let roc = roc_curve(y_valid, scores).map_err(|_| TrainError::DegenerateValidationFold)?;
    let pr = pr_curve(y_valid, scores).map_err(|_| TrainError::DegenerateValidationFold)?;

    let artifacts = [
        (
            "roc.svg",
            curve_svg(&roc, "ROC Curve", "False positive rate", "True positive rate"),
        ),
        (
            "pr.svg",
            curve_svg(&pr, "Precision-Recall Curve", "Recall", "Precision"),
        ),
        ("roc_points.json", serde_json::to_string_pretty(&roc)?),
        ("pr_points.json", serde_json::to_string_pretty(&pr)?),
    ];
    for (file, content) in artifacts {
        let path = dir.join(file);
        fs::write(&path, content)?;
        tracker.log_artifact(run_id, path.to_string_lossy())?;
    }
    Ok(())
}
