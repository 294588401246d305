use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;

use crate::{AppError, AppState};
use alert_service::AlertQueue;
use ara_core::{calendar, Market};
use dataset_store::AlertSchedule;
use std::sync::Arc;

/// Poll interval of the delivery loop when the queue is empty.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateScheduleRequest {
    #[serde(default)]
    pub market: Option<String>,
    /// Local "HH:MM" run time.
    pub run_at_local: String,
    /// Fixed UTC offset of the schedule's local time, default Jakarta (+420).
    #[serde(default = "default_tz_offset")]
    pub tz_offset_minutes: i32,
    #[serde(default = "default_k")]
    pub k: i64,
    #[serde(default = "default_liq")]
    pub liq: f64,
    #[serde(default = "default_exclude")]
    pub exclude_watchlist: bool,
    #[serde(default)]
    pub channels: Vec<String>,
}

fn default_tz_offset() -> i32 {
    7 * 60
}
fn default_k() -> i64 {
    50
}
fn default_liq() -> f64 {
    0.5
}
fn default_exclude() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct CreateScheduleResponse {
    pub id: String,
    pub next_run: DateTime<Utc>,
}

#[utoipa::path(
    get,
    path = "/alerts/stream",
    responses((status = 200, description = "SSE stream of queued alerts")),
    tag = "Alerts"
)]
pub async fn alert_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let queue = state.alert_queue.clone();
    // Cooperative pull loop: drain one alert per tick, sleep while empty.
    // Dropping the connection drops the stream and ends the loop.
    let stream = futures_util::stream::unfold(queue, |queue: Arc<AlertQueue>| async move {
        loop {
            if let Some(alert) = queue.pop().await {
                let event = match serde_json::to_string(&alert) {
                    Ok(json) => Event::default().event("alert").data(json),
                    Err(e) => {
                        tracing::warn!(error = %e, "unserializable alert dropped");
                        continue;
                    }
                };
                return Some((Ok(event), queue));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[utoipa::path(
    post,
    path = "/alerts/schedules",
    request_body = CreateScheduleRequest,
    responses((status = 200, description = "Created schedule with its first run time")),
    tag = "Alerts"
)]
pub async fn create_schedule(
    State(state): State<AppState>,
    Json(request): Json<CreateScheduleRequest>,
) -> Result<Json<CreateScheduleResponse>, AppError> {
    let Some(store) = &state.store else {
        return Err(AppError::with_status(
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            "dataset store not configured",
        ));
    };
    let market = request.market.clone().map(Market::from).unwrap_or_default();
    let next_run = calendar::next_run_utc(&request.run_at_local, request.tz_offset_minutes, Utc::now())
        .ok_or_else(|| AppError::bad_request("run_at_local must be HH:MM"))?;

    let id = store
        .create_schedule(
            &market,
            &request.run_at_local,
            request.tz_offset_minutes,
            request.k,
            request.liq,
            request.exclude_watchlist,
            &request.channels,
            next_run,
        )
        .await?;
    Ok(Json(CreateScheduleResponse { id, next_run }))
}

#[utoipa::path(
    get,
    path = "/alerts/pending",
    responses((status = 200, description = "Schedules due to run now")),
    tag = "Alerts"
)]
pub async fn pending_schedules(
    State(state): State<AppState>,
) -> Result<Json<Vec<AlertSchedule>>, AppError> {
    let Some(store) = &state.store else {
        return Err(AppError::with_status(
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            "dataset store not configured",
        ));
    };
    Ok(Json(store.due_schedules(Utc::now()).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/alerts/stream", get(alert_stream))
        .route("/alerts/schedules", post(create_schedule))
        .route("/alerts/pending", get(pending_schedules))
}
