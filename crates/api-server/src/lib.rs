//! HTTP surface for the ARA ranking service.
//!
//! Shared-state rules: the model bundle is loaded once before serving and
//! is read-only for the process lifetime. The alert queue is written by the
//! scoring routes and drained by the SSE stream. The score cache is read
//! and written only by `/score_latest` (invalidated when a newer dataset
//! supersedes the cached one).

mod alert_routes;
mod dataset_routes;
mod ingest_routes;
mod meta_routes;
mod pipeline;
mod score_routes;

pub use pipeline::{score_table, BoardMeta, ScoreParams, ScoreResponse};

use alert_service::{AlertConfig, AlertDispatcher, AlertQueue};
use ara_core::AraError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use dashmap::DashMap;
use dataset_store::DatasetStore;
use ingestion::{DailyBarProvider, ExtractorRegistry, YahooChartClient};
use scoring_engine::ModelBundle;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

// ---------------------------------------------------------------------------
// Response envelope and error mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<AraError> for AppError {
    fn from(e: AraError) -> Self {
        let status = match &e {
            AraError::InputSchema(_) | AraError::FeatureMismatch { .. } => StatusCode::BAD_REQUEST,
            AraError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AraError::UnsupportedSource(_) => StatusCode::NOT_IMPLEMENTED,
            AraError::BundleLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
            AraError::Scoring(_) | AraError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Unexpected scoring/store faults surface generically; details go to the log.
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %e, "request failed");
            return Self::with_status(status, "internal server error");
        }
        Self::with_status(status, e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::error(self.message))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// One `/score_latest` result kept per market so dashboard polling does not
/// re-run inference until a newer dataset arrives or the parameters change.
#[derive(Clone)]
pub struct CachedScore {
    pub dataset_id: String,
    pub params: ScoreParams,
    pub response: ScoreResponse,
}

#[derive(Clone)]
pub struct AppState {
    pub bundle: Arc<ModelBundle>,
    pub store: Option<DatasetStore>,
    pub registry: Arc<ExtractorRegistry>,
    pub scrape_provider: Arc<dyn DailyBarProvider>,
    pub alert_queue: Arc<AlertQueue>,
    pub dispatcher: Arc<AlertDispatcher>,
    pub alert_threshold: f64,
    pub score_cache: Arc<DashMap<String, CachedScore>>,
}

impl AppState {
    pub fn new(bundle: ModelBundle, store: Option<DatasetStore>, alert_config: &AlertConfig) -> Self {
        Self {
            bundle: Arc::new(bundle),
            store,
            registry: Arc::new(ExtractorRegistry::default()),
            scrape_provider: Arc::new(YahooChartClient::new()),
            alert_queue: Arc::new(AlertQueue::new()),
            dispatcher: Arc::new(AlertDispatcher::from_config(alert_config)),
            alert_threshold: alert_config.threshold,
            score_cache: Arc::new(DashMap::new()),
        }
    }
}

// ---------------------------------------------------------------------------
// Router and server bootstrap
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        meta_routes::health,
        meta_routes::meta,
        meta_routes::metrics,
        score_routes::score,
        score_routes::score_latest,
        ingest_routes::ingest_file,
        ingest_routes::ingest_paste,
        ingest_routes::ingest_scrape,
        dataset_routes::get_dataset,
        dataset_routes::list_datasets,
        alert_routes::alert_stream,
        alert_routes::create_schedule,
        alert_routes::pending_schedules,
    ),
    info(title = "ARA Rank API", version = "1.0.0")
)]
struct ApiDoc;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(meta_routes::routes())
        .merge(score_routes::routes())
        .merge(ingest_routes::routes())
        .merge(dataset_routes::routes())
        .merge(alert_routes::routes())
        .route(
            "/api-docs/openapi.json",
            axum::routing::get(|| async { Json(ApiDoc::openapi()) }),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api_server=info,tower_http=warn".into()),
        )
        .init();

    let bundle_dir =
        PathBuf::from(std::env::var("ARA_BUNDLE_DIR").unwrap_or_else(|_| "./bundle".to_string()));
    let fallback_dir = std::env::var("ARA_BUNDLE_FALLBACK_DIR").ok().map(PathBuf::from);

    // The bundle is the only thing allowed to abort startup: with no models
    // there is nothing to serve.
    let bundle = ModelBundle::load_with_fallback(&bundle_dir, fallback_dir.as_deref())?;

    let db_path = std::env::var("ARA_DB_PATH").unwrap_or_else(|_| "ara_rank.db".to_string());
    let store = match DatasetStore::connect(&db_path).await {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::warn!(db = %db_path, error = %e, "dataset store unavailable, ingestion persistence disabled");
            None
        }
    };

    let alert_config = AlertConfig::from_env();
    tracing::info!(threshold = alert_config.threshold, "alert threshold configured");

    let state = AppState::new(bundle, store, &alert_config);
    let app = router(state);

    let bind_addr = std::env::var("ARA_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "ara-rank api listening");
    axum::serve(listener, app).await?;
    Ok(())
}
