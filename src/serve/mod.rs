//! Model serving HTTP API
//!
//! A small axum service around one loaded [`ReadmissionPipeline`]. The
//! model session starts empty unless the config names an initial model;
//! `POST /model/load` swaps the active pipeline without restarting the
//! process. Endpoints:
//!
//! - `GET /health` liveness and loaded-model status
//! - `POST /model/load` load a pipeline by model locator
//! - `POST /predict` score one JSON record
//! - `POST /predict/batch` score a raw CSV body

mod handlers;

pub use handlers::{health, load_model, predict, predict_batch};

use crate::model::ReadmissionPipeline;
use crate::registry::ModelLocator;
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("Bind error: {0}")]
    Bind(String),

    #[error("Cannot load initial model: {0}")]
    InitialModel(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for server operations
pub type Result<T> = std::result::Result<T, ServeError>;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: SocketAddr,
    /// Store root holding runs and the registry
    pub store: PathBuf,
    /// Locator of a model to load at startup
    pub initial_model: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            // bind failures surface at startup, not here
            address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            store: PathBuf::from("store"),
            initial_model: None,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn with_address(mut self, address: SocketAddr) -> Self {
        self.address = address;
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: impl Into<PathBuf>) -> Self {
        self.store = store.into();
        self
    }

    #[must_use]
    pub fn with_initial_model(mut self, locator: impl Into<String>) -> Self {
        self.initial_model = Some(locator.into());
        self
    }
}

/// API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    /// Request ID for tracing
    pub request_id: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, request_id: &str) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            request_id: request_id.to_string(),
        }
    }

    pub fn error(message: &str, request_id: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.to_string()),
            request_id: request_id.to_string(),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub model: Option<ModelInfo>,
}

/// Description of the loaded model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub locator: String,
    pub loaded_at: DateTime<Utc>,
    pub n_trees: usize,
    pub n_features: usize,
}

/// Load model request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadModelRequest {
    pub locator: String,
}

/// Batch prediction response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPredictResponse {
    pub n_rows: usize,
    /// Readmission probability per input row, in input order
    pub probabilities: Vec<f64>,
}

/// Single-record prediction response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub probability: f64,
}

/// The currently loaded pipeline and where it came from
#[derive(Debug)]
pub struct LoadedModel {
    pub locator: String,
    pub pipeline: ReadmissionPipeline,
    pub loaded_at: DateTime<Utc>,
}

/// Model session; empty until a load succeeds, replaced atomically on reload
#[derive(Debug, Default)]
pub struct ModelSession {
    pub model: Option<LoadedModel>,
}

impl ModelSession {
    #[must_use]
    pub fn info(&self) -> Option<ModelInfo> {
        self.model.as_ref().map(|m| ModelInfo {
            locator: m.locator.clone(),
            loaded_at: m.loaded_at,
            n_trees: m.pipeline.booster.n_trees(),
            n_features: m.pipeline.transform.n_features(),
        })
    }
}

/// Shared server state
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<RwLock<ModelSession>>,
    pub store: PathBuf,
    started: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(store: impl Into<PathBuf>) -> Self {
        Self {
            session: Arc::new(RwLock::new(ModelSession::default())),
            store: store.into(),
            started: Instant::now(),
        }
    }

    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

/// Build the API router over the given state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/model/load", post(handlers::load_model))
        .route("/predict", post(handlers::predict))
        .route("/predict/batch", post(handlers::predict_batch))
        .with_state(state)
}

/// Run the server until the process is stopped
pub async fn run(config: ServerConfig) -> Result<()> {
    let state = AppState::new(&config.store);

    if let Some(locator) = &config.initial_model {
        let parsed = ModelLocator::parse(locator)
            .map_err(|e| ServeError::InitialModel(e.to_string()))?;
        let session =
            handlers::load_session(&parsed, &config.store).map_err(ServeError::InitialModel)?;
        if let Ok(mut guard) = state.session.write() {
            guard.model = Some(session);
        }
        println!("Loaded model {locator}");
    }

    let listener = tokio::net::TcpListener::bind(config.address)
        .await
        .map_err(|e| ServeError::Bind(format!("{}: {e}", config.address)))?;
    println!("Serving on http://{}", config.address);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builders() {
        let addr: SocketAddr = "0.0.0.0:9000".parse().unwrap();
        let config = ServerConfig::default()
            .with_address(addr)
            .with_store("/tmp/store")
            .with_initial_model("models:/hospital_readmission/Production");
        assert_eq!(config.address.port(), 9000);
        assert_eq!(config.store, PathBuf::from("/tmp/store"));
        assert_eq!(
            config.initial_model.as_deref(),
            Some("models:/hospital_readmission/Production")
        );
    }

    #[test]
    fn api_response_shapes() {
        let ok = ApiResponse::success(7u32, "req-1");
        assert!(ok.success);
        assert_eq!(ok.data, Some(7));
        assert!(ok.error.is_none());

        let err: ApiResponse<u32> = ApiResponse::error("no model loaded", "req-2");
        assert!(!err.success);
        assert!(err.data.is_none());
        assert_eq!(err.error.as_deref(), Some("no model loaded"));
    }

    #[test]
    fn empty_session_has_no_info() {
        let session = ModelSession::default();
        assert!(session.info().is_none());
    }
}
