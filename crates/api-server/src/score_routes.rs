use axum::extract::{Multipart, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::pipeline::{score_table, BoardMeta, ScoreParams, ScoreResponse};
use crate::{AppError, AppState, CachedScore};
use ara_core::{Market, RawTable};
use ingestion::{CsvExtractor, Extractor, SourcePayload};

#[derive(Debug, Deserialize)]
pub struct ScoreQuery {
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_liq")]
    pub liq: f64,
    #[serde(default = "default_exclude")]
    pub exclude_watchlist: bool,
    #[serde(default)]
    pub market: Option<String>,
}

fn default_k() -> usize {
    50
}
fn default_liq() -> f64 {
    0.5
}
fn default_exclude() -> bool {
    true
}

impl ScoreQuery {
    fn params(&self) -> Result<ScoreParams, AppError> {
        if !(1..=200).contains(&self.k) {
            return Err(AppError::bad_request("k must be between 1 and 200"));
        }
        if !(0.0..=1.0).contains(&self.liq) {
            return Err(AppError::bad_request("liq must be in [0, 1]"));
        }
        Ok(ScoreParams {
            k: self.k,
            liq: self.liq,
            exclude_watchlist: self.exclude_watchlist,
        })
    }

    fn market(&self) -> Market {
        self.market.clone().map(Market::from).unwrap_or_default()
    }
}

#[utoipa::path(
    post,
    path = "/score",
    responses(
        (status = 200, description = "Ranked top-K and screened top-K for the latest day"),
        (status = 400, description = "Missing Date column or missing bundle features")
    ),
    tag = "Scoring"
)]
pub async fn score(
    State(state): State<AppState>,
    Query(query): Query<ScoreQuery>,
    mut multipart: Multipart,
) -> Result<Json<ScoreResponse>, AppError> {
    let params = query.params()?;
    let market = query.market();

    let mut features: Option<RawTable> = None;
    let mut raw: Option<RawTable> = None;
    let mut board: Option<BoardMeta> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("bad multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::bad_request(format!("unreadable field {name}: {e}")))?;
        let payload = SourcePayload::Bytes(bytes.to_vec());
        match name.as_str() {
            "features_csv" => features = Some(CsvExtractor.extract(&payload)?),
            "raw_csv" => raw = Some(CsvExtractor.extract(&payload)?),
            "board_meta" => {
                let table = CsvExtractor.extract(&payload)?;
                board = BoardMeta::from_table(&table, &market);
            }
            other => {
                tracing::debug!(field = other, "ignoring unknown multipart field");
            }
        }
    }

    let Some(mut features) = features else {
        return Err(AppError::bad_request("features_csv upload is required"));
    };

    let response = score_table(
        &state,
        &mut features,
        raw.as_mut(),
        board.as_ref(),
        &market,
        &params,
    )
    .await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/score_latest",
    responses(
        (status = 200, description = "Scores the most recently ingested dataset"),
        (status = 404, description = "No dataset ingested yet")
    ),
    tag = "Scoring"
)]
pub async fn score_latest(
    State(state): State<AppState>,
    Query(query): Query<ScoreQuery>,
) -> Result<Json<ScoreResponse>, AppError> {
    let params = query.params()?;
    let market = query.market();

    let Some(store) = &state.store else {
        return Err(AppError::with_status(
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            "dataset store not configured",
        ));
    };
    let Some(record) = store.latest_dataset(&market, None).await? else {
        return Err(AppError::not_found("no dataset ingested yet"));
    };

    // Serve the cached result while it still reflects the newest dataset
    // and the same screening parameters.
    let cache_key = market.as_str().to_string();
    if let Some(cached) = state.score_cache.get(&cache_key) {
        if cached.dataset_id == record.id && cached.params == params {
            return Ok(Json(cached.response.clone()));
        }
    }

    // The stored table is its own liquidity source: same-day volumes.
    let mut features = record.table.clone();
    let mut raw = record.table.clone();
    let response = score_table(
        &state,
        &mut features,
        Some(&mut raw),
        None,
        &market,
        &params,
    )
    .await?;

    state.score_cache.insert(
        cache_key,
        CachedScore {
            dataset_id: record.id,
            params,
            response: response.clone(),
        },
    );
    Ok(Json(response))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/score", post(score))
        .route("/score_latest", get(score_latest))
}
