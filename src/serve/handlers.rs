//! HTTP request handlers

use super::{
    ApiResponse, AppState, BatchPredictResponse, HealthResponse, LoadModelRequest, LoadedModel,
    ModelInfo, PredictResponse,
};
use crate::data::{read_frame_from_reader, Cell, Frame};
use crate::model::{ModelError, ReadmissionPipeline};
use crate::registry::{FsRegistry, ModelLocator};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use std::path::Path;

/// Generate a request ID
fn request_id() -> String {
    format!("req-{:016x}", rand::random::<u64>())
}

/// Health check handler
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let model = state
        .session
        .read()
        .ok()
        .and_then(|session| session.info());

    let health = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        model,
    };
    (StatusCode::OK, Json(health))
}

/// Resolve a locator and load its pipeline
pub(super) fn load_session(
    locator: &ModelLocator,
    store: &Path,
) -> std::result::Result<LoadedModel, String> {
    let registry = FsRegistry::open(store).map_err(|e| e.to_string())?;
    let path = locator.resolve(&registry, store).map_err(|e| e.to_string())?;
    let pipeline = ReadmissionPipeline::load(&path)
        .map_err(|e| format!("{}: {e}", path.display()))?;
    Ok(LoadedModel {
        locator: locator.to_string(),
        pipeline,
        loaded_at: Utc::now(),
    })
}

/// Load (or replace) the active model
pub async fn load_model(
    State(state): State<AppState>,
    Json(payload): Json<LoadModelRequest>,
) -> (StatusCode, Json<ApiResponse<ModelInfo>>) {
    let req_id = request_id();

    let locator = match ModelLocator::parse(&payload.locator) {
        Ok(locator) => locator,
        Err(e) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ApiResponse::error(&e.to_string(), &req_id)),
            );
        }
    };

    match load_session(&locator, &state.store) {
        Ok(loaded) => {
            let info = ModelInfo {
                locator: loaded.locator.clone(),
                loaded_at: loaded.loaded_at,
                n_trees: loaded.pipeline.booster.n_trees(),
                n_features: loaded.pipeline.transform.n_features(),
            };
            let Ok(mut session) = state.session.write() else {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::error("model session poisoned", &req_id)),
                );
            };
            session.model = Some(loaded);
            (StatusCode::OK, Json(ApiResponse::success(info, &req_id)))
        }
        Err(e) => (StatusCode::NOT_FOUND, Json(ApiResponse::error(&e, &req_id))),
    }
}

/// Score one JSON record
pub async fn predict(
    State(state): State<AppState>,
    Json(record): Json<serde_json::Map<String, serde_json::Value>>,
) -> (StatusCode, Json<ApiResponse<PredictResponse>>) {
    let req_id = request_id();

    let frame = match record_to_frame(&record) {
        Ok(frame) => frame,
        Err(e) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ApiResponse::error(&e, &req_id)),
            );
        }
    };

    match score(&state, &frame) {
        Ok(probabilities) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                PredictResponse {
                    probability: probabilities[0],
                },
                &req_id,
            )),
        ),
        Err((status, message)) => (status, Json(ApiResponse::error(&message, &req_id))),
    }
}

/// Score a raw CSV body
pub async fn predict_batch(
    State(state): State<AppState>,
    body: String,
) -> (StatusCode, Json<ApiResponse<BatchPredictResponse>>) {
    let req_id = request_id();

    let frame = match read_frame_from_reader(body.as_bytes()) {
        Ok(frame) => frame,
        Err(e) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ApiResponse::error(&format!("CSV parse error: {e}"), &req_id)),
            );
        }
    };

    match score(&state, &frame) {
        Ok(probabilities) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                BatchPredictResponse {
                    n_rows: probabilities.len(),
                    probabilities,
                },
                &req_id,
            )),
        ),
        Err((status, message)) => (status, Json(ApiResponse::error(&message, &req_id))),
    }
}

/// One JSON object becomes a one-row frame. Numbers stay numeric; strings
/// go through the usual field parsing; nulls are missing.
fn record_to_frame(
    record: &serde_json::Map<String, serde_json::Value>,
) -> std::result::Result<Frame, String> {
    if record.is_empty() {
        return Err("record has no fields".to_string());
    }

    let mut frame = Frame::new();
    for (name, value) in record {
        let cell = match value {
            serde_json::Value::Null => Cell::Missing,
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(Cell::Num)
                .ok_or_else(|| format!("field '{name}' is not a finite number"))?,
            serde_json::Value::String(s) => Cell::from_field(s),
            other => {
                return Err(format!(
                    "field '{name}' must be a scalar, got {other}"
                ));
            }
        };
        frame
            .push_column(name.clone(), vec![cell])
            .map_err(|e| e.to_string())?;
    }
    Ok(frame)
}

fn score(state: &AppState, frame: &Frame) -> std::result::Result<Vec<f64>, (StatusCode, String)> {
    let session = state
        .session
        .read()
        .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "model session poisoned".to_string()))?;
    let Some(loaded) = &session.model else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "no model loaded; POST /model/load first".to_string(),
        ));
    };

    loaded.pipeline.predict(frame).map_err(|e| match e {
        ModelError::MissingColumns(_) | ModelError::EmptyInput => {
            (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boost::{BoostParams, GradientBoostedTrees};
    use crate::data::Lookups;
    use crate::features::enrich_and_clean;
    use crate::model::Manifest;
    use crate::preprocess::FittedTransform;
    use serde_json::json;

    fn fitted_pipeline() -> ReadmissionPipeline {
        use crate::features::map_readmitted;

        let mut csv = String::from("age,insulin,time_in_hospital,readmitted\n");
        for i in 0..30 {
            if i % 2 == 0 {
                csv.push_str("[70-80),Steady,10,<30\n");
            } else {
                csv.push_str("[40-50),No,2,NO\n");
            }
        }
        let raw = read_frame_from_reader(csv.as_bytes()).unwrap();
        let y: Vec<u8> = raw
            .column("readmitted")
            .unwrap()
            .iter()
            .map(map_readmitted)
            .collect();
        let mut features = raw.clone();
        features.drop_column("readmitted");
        let raw_columns = features.names().to_vec();

        let enriched = enrich_and_clean(&features, &Lookups::none());
        let transform = FittedTransform::fit(&enriched).unwrap();
        let matrix = transform.transform(&enriched).unwrap();
        let booster = GradientBoostedTrees::fit(
            &matrix,
            &y,
            BoostParams {
                n_trees: 10,
                max_depth: 3,
                learning_rate: 0.3,
                ..BoostParams::default()
            },
        )
        .unwrap();

        ReadmissionPipeline {
            manifest: Manifest::from_fitted(&raw_columns, &transform, 42),
            lookups: Lookups::none(),
            transform,
            booster,
        }
    }

    fn state_with_model(dir: &Path) -> AppState {
        let model_path = dir.join("model.json");
        fitted_pipeline().save(&model_path).unwrap();

        let state = AppState::new(dir.join("store"));
        let locator = ModelLocator::parse(&model_path.to_string_lossy()).unwrap();
        let loaded = load_session(&locator, &state.store).unwrap();
        state.session.write().unwrap().model = Some(loaded);
        state
    }

    #[tokio::test]
    async fn health_reports_the_loaded_model() {
        let dir = tempfile::tempdir().unwrap();

        let empty = AppState::new(dir.path());
        let (status, Json(body)) = health(State(empty)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.model.is_none());

        let state = state_with_model(dir.path());
        let (_, Json(body)) = health(State(state)).await;
        let model = body.model.unwrap();
        assert_eq!(model.n_trees, 10);
        assert!(model.locator.ends_with("model.json"));
    }

    #[tokio::test]
    async fn predict_scores_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_model(dir.path());

        let record = json!({
            "age": "[70-80)",
            "insulin": "Steady",
            "time_in_hospital": 10
        });
        let (status, Json(body)) = predict(
            State(state),
            Json(record.as_object().unwrap().clone()),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let p = body.data.unwrap().probability;
        assert!((0.0..=1.0).contains(&p));
        assert!(p > 0.5);
    }

    #[tokio::test]
    async fn predict_defaults_absent_medications() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_model(dir.path());

        // no insulin field: defaults to "No" instead of failing
        let record = json!({"age": "[40-50)", "time_in_hospital": 2});
        let (status, Json(body)) = predict(
            State(state),
            Json(record.as_object().unwrap().clone()),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.data.unwrap().probability < 0.5);
    }

    #[tokio::test]
    async fn predict_missing_required_column_is_422() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_model(dir.path());

        let record = json!({"insulin": "No"});
        let (status, Json(body)) = predict(
            State(state),
            Json(record.as_object().unwrap().clone()),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.error.unwrap().contains("age"));
    }

    #[tokio::test]
    async fn predict_without_model_is_503() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(dir.path());

        let record = json!({"age": "[40-50)"});
        let (status, _) = predict(
            State(state),
            Json(record.as_object().unwrap().clone()),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn batch_returns_one_probability_per_row() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_model(dir.path());

        let csv = "age,insulin,time_in_hospital\n[70-80),Steady,10\n[40-50),No,2\n[40-50),No,3\n";
        let (status, Json(body)) = predict_batch(State(state), csv.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        let data = body.data.unwrap();
        assert_eq!(data.n_rows, 3);
        assert_eq!(data.probabilities.len(), 3);
        for p in &data.probabilities {
            assert!((0.0..=1.0).contains(p));
        }
    }

    #[tokio::test]
    async fn load_model_rejects_bad_locators() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(dir.path());

        let (status, Json(body)) = load_model(
            State(state),
            Json(LoadModelRequest {
                locator: "models:/name-without-selector".to_string(),
            }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(!body.success);
    }

    #[tokio::test]
    async fn load_model_replaces_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_model(dir.path());

        let other_path = dir.path().join("other.json");
        fitted_pipeline().save(&other_path).unwrap();

        let (status, Json(body)) = load_model(
            State(state.clone()),
            Json(LoadModelRequest {
                locator: other_path.to_string_lossy().to_string(),
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.success);
        let session = state.session.read().unwrap();
        assert!(session.model.as_ref().unwrap().locator.ends_with("other.json"));
    }
}
