//! Readmitir: 30-day hospital readmission pipeline
//!
//! A small MLOps workflow for predicting 30-day hospital readmission from
//! tabular patient-encounter records. The crate covers the full path from a
//! raw CSV to a served probability:
//!
//! - **`features`**: deterministic row-wise enrichment (special-token
//!   normalization, age-bucket midpoints, ICD chapter bucketing) that runs
//!   identically at training and inference time
//! - **`preprocess`**: a two-branch fitted transform (numeric impute+scale,
//!   categorical impute+one-hot) persisted with the model
//! - **`boost`**: a seeded gradient-boosted tree classifier with logistic
//!   loss and positive-class weighting
//! - **`tracking`** / **`registry`**: experiment runs and a versioned,
//!   write-once model store with a promotion gate
//! - **`serve`**: an HTTP scoring service with single-record and batch-CSV
//!   endpoints
//!
//! # Example
//!
//! ```no_run
//! use readmitir::train::{run_training, TrainOptions};
//!
//! let opts = TrainOptions::new("encounters.csv", "store")
//!     .with_register("hospital_readmission");
//! let report = run_training(&opts).unwrap();
//! println!("[run_id] {}", report.run_id);
//! ```

pub mod boost;
pub mod cli;
pub mod data;
pub mod eval;
pub mod features;
pub mod model;
pub mod preprocess;
pub mod registry;
pub mod serve;
pub mod tracking;
pub mod train;

/// Crate-level error aggregating the per-module error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Data(#[from] data::DataError),

    #[error(transparent)]
    Preprocess(#[from] preprocess::PreprocessError),

    #[error(transparent)]
    Boost(#[from] boost::BoostError),

    #[error(transparent)]
    Eval(#[from] eval::EvalError),

    #[error(transparent)]
    Model(#[from] model::ModelError),

    #[error(transparent)]
    Tracking(#[from] tracking::TrackingError),

    #[error(transparent)]
    Registry(#[from] registry::RegistryError),

    #[error(transparent)]
    Train(#[from] train::TrainError),

    #[error(transparent)]
    Serve(#[from] serve::ServeError),
}

/// Crate-level result alias
pub type Result<T> = std::result::Result<T, Error>;
