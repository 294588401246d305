use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub models: usize,
    pub has_calibrator: bool,
    pub features_from_bundle: bool,
}

#[derive(Debug, Serialize)]
pub struct MetaResponse {
    pub card: serde_json::Value,
    pub required_features_count: Option<usize>,
    pub required_features_sample: Option<Vec<String>>,
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service liveness and bundle summary")),
    tag = "System"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        models: state.bundle.num_models(),
        has_calibrator: state.bundle.has_calibrator(),
        features_from_bundle: state.bundle.required_features.is_some(),
    })
}

#[utoipa::path(
    get,
    path = "/meta",
    responses((status = 200, description = "Model card and required-feature summary")),
    tag = "System"
)]
pub async fn meta(State(state): State<AppState>) -> Json<MetaResponse> {
    let features = state.bundle.required_features.as_ref();
    Json(MetaResponse {
        card: state.bundle.card.clone(),
        required_features_count: features.map(Vec::len),
        required_features_sample: features.map(|f| f.iter().take(10).cloned().collect()),
    })
}

#[utoipa::path(
    get,
    path = "/metrics",
    responses((status = 200, description = "Model-card validation metrics passthrough")),
    tag = "System"
)]
pub async fn metrics(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(
        state
            .bundle
            .card
            .get("metrics")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({})),
    )
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/meta", get(meta))
        .route("/metrics", get(metrics))
}
