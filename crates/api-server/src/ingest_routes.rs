use axum::extract::{Multipart, Path, Query, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState};
use ara_core::{Market, RawTable, ValidationReport, ValidationStatus};
use ingestion::{normalize, scrape_daily_bars, validate, SourceKind, SourcePayload};

#[derive(Debug, Deserialize)]
pub struct IngestQuery {
    #[serde(default)]
    pub market: Option<String>,
}

impl IngestQuery {
    fn market(&self) -> Market {
        self.market.clone().map(Market::from).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub dataset_id: Option<String>,
    pub status: ValidationStatus,
    pub notes: ara_core::ValidationNotes,
    pub rows: usize,
    pub source: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct PasteRequest {
    pub text: String,
    #[serde(default)]
    pub market: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScrapeQuery {
    pub source: String,
    pub tickers: String,
    #[serde(default)]
    pub market: Option<String>,
}

/// Persist a normalized, validated table and assemble the common response.
/// Error-status datasets are returned to the caller but never persisted.
async fn finish(
    state: &AppState,
    table: RawTable,
    report: ValidationReport,
    source_type: &str,
    source_name: &str,
    market: &Market,
) -> Result<IngestResponse, AppError> {
    let dataset_id = match (&state.store, report.status) {
        (Some(store), ValidationStatus::Valid | ValidationStatus::Warning) => Some(
            store
                .save_dataset(&table, source_type, source_name, market, &report, None)
                .await?,
        ),
        _ => None,
    };
    Ok(IngestResponse {
        dataset_id,
        status: report.status,
        notes: report.notes,
        rows: table.len(),
        source: source_type.to_string(),
    })
}

#[utoipa::path(
    post,
    path = "/ingest/{kind}",
    responses(
        (status = 200, description = "Extracted, validated and persisted dataset"),
        (status = 422, description = "No parseable table in the upload"),
        (status = 501, description = "No extractor registered for this source kind")
    ),
    tag = "Ingestion"
)]
pub async fn ingest_file(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<IngestQuery>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>, AppError> {
    let Some(kind) = SourceKind::from_str(&kind) else {
        return Err(AppError::not_found(format!("unknown ingestion source: {kind}")));
    };
    if matches!(kind, SourceKind::Paste | SourceKind::Scrape) {
        return Err(AppError::bad_request(
            "paste and scrape have dedicated endpoints",
        ));
    }
    let market = query.market();

    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("bad multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or("upload").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::bad_request(format!("unreadable upload: {e}")))?;
            file = Some((name, bytes.to_vec()));
        }
    }
    let Some((file_name, bytes)) = file else {
        return Err(AppError::bad_request("file upload is required"));
    };

    let payload = SourcePayload::Bytes(bytes);
    let (table, report) = ingestion::ingest(&state.registry, kind, &payload, &market)?;
    let response = finish(&state, table, report, kind.as_str(), &file_name, &market).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/ingest/paste",
    request_body = PasteRequest,
    responses((status = 200, description = "Parsed pasted rows into a dataset")),
    tag = "Ingestion"
)]
pub async fn ingest_paste(
    State(state): State<AppState>,
    Json(request): Json<PasteRequest>,
) -> Result<Json<IngestResponse>, AppError> {
    let market = request.market.clone().map(Market::from).unwrap_or_default();
    let payload = SourcePayload::Text(request.text);
    let (table, report) =
        ingestion::ingest(&state.registry, SourceKind::Paste, &payload, &market)?;
    let response = finish(&state, table, report, "paste", "paste", &market).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/ingest/scrape",
    responses(
        (status = 200, description = "Scraped recent daily bars into a dataset"),
        (status = 422, description = "Provider returned no data")
    ),
    tag = "Ingestion"
)]
pub async fn ingest_scrape(
    State(state): State<AppState>,
    Query(query): Query<ScrapeQuery>,
) -> Result<Json<IngestResponse>, AppError> {
    if query.source.to_lowercase() != "yahoo" {
        return Err(AppError::bad_request(format!(
            "unsupported scrape source: {}",
            query.source
        )));
    }
    let market = query.market.clone().map(Market::from).unwrap_or_default();
    let tickers: Vec<String> = query
        .tickers
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    let mut table = scrape_daily_bars(state.scrape_provider.as_ref(), &tickers, &market).await?;
    normalize(&mut table, &market);
    let report = validate(&table);
    let source_name = format!("yahoo:{}", tickers.join(","));
    let response = finish(&state, table, report, "scrape_yahoo", &source_name, &market).await?;
    Ok(Json(response))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ingest/paste", post(ingest_paste))
        .route("/ingest/scrape", post(ingest_scrape))
        .route("/ingest/:kind", post(ingest_file))
}
