use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{AppError, AppState};
use ara_core::Market;
use dataset_store::{DatasetRecord, DatasetStore, DatasetSummary};

#[derive(Debug, Deserialize)]
pub struct DatasetListQuery {
    #[serde(default)]
    pub market: Option<String>,
    pub asof: NaiveDate,
}

fn store(state: &AppState) -> Result<&DatasetStore, AppError> {
    state.store.as_ref().ok_or_else(|| {
        AppError::with_status(
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            "dataset store not configured",
        )
    })
}

#[utoipa::path(
    get,
    path = "/datasets/{id}",
    responses(
        (status = 200, description = "Full persisted dataset"),
        (status = 404, description = "Unknown dataset id")
    ),
    tag = "Datasets"
)]
pub async fn get_dataset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DatasetRecord>, AppError> {
    let record = store(&state)?
        .get_dataset(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("no dataset with id {id}")))?;
    Ok(Json(record))
}

#[utoipa::path(
    get,
    path = "/datasets",
    responses((status = 200, description = "Datasets ingested for one as-of date")),
    tag = "Datasets"
)]
pub async fn list_datasets(
    State(state): State<AppState>,
    Query(query): Query<DatasetListQuery>,
) -> Result<Json<Vec<DatasetSummary>>, AppError> {
    let market = query.market.clone().map(Market::from).unwrap_or_default();
    let summaries = store(&state)?.datasets_by_date(&market, query.asof).await?;
    Ok(Json(summaries))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/datasets", get(list_datasets))
        .route("/datasets/:id", get(get_dataset))
}
