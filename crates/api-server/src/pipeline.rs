//! The scoring pipeline shared by `/score` and `/score_latest`:
//! latest-day slice -> feature frame -> ensemble -> liquidity/board joins ->
//! rank -> screen -> top-K -> alert emission.

use crate::{AppError, AppState};
use ara_core::{AraError, Market, RawTable, ScoredRow};
use chrono::NaiveDate;
use ingestion::{normalize, normalize_ticker};
use scoring_engine::{predict_mean, FeatureFrame};
use screening::{rank_descending, screen, top_k, vol_rank_day};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreParams {
    pub k: usize,
    pub liq: f64,
    pub exclude_watchlist: bool,
}

impl Default for ScoreParams {
    fn default() -> Self {
        Self {
            k: 50,
            liq: 0.5,
            exclude_watchlist: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScreeningInfo {
    pub exclude_watchlist: bool,
    pub liq_floor: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreResponse {
    pub latest_date: NaiveDate,
    pub rows_scored: usize,
    pub top_all: Vec<ScoredRow>,
    pub top_screened: Vec<ScoredRow>,
    pub screening: ScreeningInfo,
}

/// Company metadata keyed by normalized ticker: (name, board).
#[derive(Debug, Default, Clone)]
pub struct BoardMeta {
    entries: HashMap<String, (Option<String>, Option<String>)>,
}

impl BoardMeta {
    /// Build from a metadata table. Column names are matched after
    /// trim+lowercase; the issuer code column is required, name and board
    /// columns are picked up under their usual aliases.
    pub fn from_table(table: &RawTable, market: &Market) -> Option<Self> {
        let lowered: Vec<String> = table
            .columns
            .iter()
            .map(|c| c.trim().to_lowercase())
            .collect();
        let find = |names: &[&str]| -> Option<usize> {
            names.iter().find_map(|n| lowered.iter().position(|c| c == n))
        };
        let code_c = find(&["kode"])?;
        let name_c = find(&["nama perusahaan", "nama"]);
        let board_c = find(&["papan pencatatan", "papan"]);

        let mut entries = HashMap::new();
        for row in &table.rows {
            let Some(code) = row[code_c].as_text() else {
                continue;
            };
            let ticker = normalize_ticker(code, market);
            let name = name_c.and_then(|c| row[c].as_text()).map(str::to_string);
            let board = board_c.and_then(|c| row[c].as_text()).map(str::to_string);
            entries.entry(ticker).or_insert((name, board));
        }
        Some(Self { entries })
    }

    fn apply(&self, rows: &mut [ScoredRow]) {
        for row in rows {
            if let Some((name, board)) = self.entries.get(&row.ticker) {
                if name.is_some() {
                    row.name = name.clone();
                }
                if board.is_some() {
                    row.board = board.clone();
                }
            }
        }
    }
}

/// Score one features table. `raw` supplies the day's volumes for the
/// liquidity rank; `board` supplies name/board metadata. Both optional —
/// rows without a liquidity rank fail any positive floor downstream.
pub async fn score_table(
    state: &AppState,
    features: &mut RawTable,
    raw: Option<&mut RawTable>,
    board: Option<&BoardMeta>,
    market: &Market,
    params: &ScoreParams,
) -> Result<ScoreResponse, AppError> {
    if features.col("Date").is_none() {
        return Err(AraError::InputSchema(vec!["Date".to_string()]).into());
    }
    normalize(features, market);
    let Some(latest_date) = features.latest_date() else {
        return Err(AppError::bad_request("features table has no parseable dates"));
    };
    let day = features.filter_date(latest_date);

    let frame = FeatureFrame::from_table(&day, state.bundle.required_features.as_deref())?;
    let proba = predict_mean(
        &state.bundle.models,
        state.bundle.calibrator.as_ref(),
        &frame,
    )?;

    let mut rows = scored_rows(&day, latest_date, &proba);

    // Liquidity: percentile-rank the raw table's volumes for the same day.
    if let Some(raw) = raw {
        normalize(raw, market);
        let raw_day = raw.filter_date(latest_date);
        if let (Some(ticker_c), Some(vol_c)) = (raw_day.col("Ticker"), raw_day.col("Volume")) {
            let volumes: Vec<(String, f64)> = raw_day
                .rows
                .iter()
                .filter_map(|r| {
                    Some((
                        r[ticker_c].as_text()?.to_string(),
                        r[vol_c].as_f64().unwrap_or(f64::NAN),
                    ))
                })
                .collect();
            let ranks = vol_rank_day(&volumes);
            screening::attach_vol_rank(&mut rows, &ranks);
        }
    }

    if let Some(board) = board {
        board.apply(&mut rows);
    }

    rank_descending(&mut rows);
    let screened = screen(&rows, params.exclude_watchlist, params.liq);
    let top_all = top_k(&rows, params.k);
    let top_screened = top_k(&screened, params.k);

    // Threshold check runs on the screened top-K, matching what subscribers see.
    let alerts = alert_service::emit(&top_screened, state.alert_threshold, market, latest_date);
    if !alerts.is_empty() {
        tracing::info!(count = alerts.len(), %latest_date, "alerts emitted");
        state.dispatcher.dispatch(alerts.clone());
        state.alert_queue.push_all(alerts).await;
    }

    Ok(ScoreResponse {
        latest_date,
        rows_scored: rows.len(),
        top_all,
        top_screened,
        screening: ScreeningInfo {
            exclude_watchlist: params.exclude_watchlist,
            liq_floor: params.liq,
        },
    })
}

/// Join (Date, Ticker) identities with the probability vector. Name/board
/// come straight off the table when it carries those columns.
fn scored_rows(day: &RawTable, latest_date: NaiveDate, proba: &[f64]) -> Vec<ScoredRow> {
    let ticker_c = day.col("Ticker");
    let name_c = day.col("Nama");
    let board_c = day.col("Papan");
    day.rows
        .iter()
        .zip(proba.iter())
        .map(|(row, p)| ScoredRow {
            date: latest_date,
            ticker: ticker_c
                .and_then(|c| row[c].as_text())
                .unwrap_or_default()
                .to_string(),
            proba: *p,
            vol_rank_day: None,
            name: name_c.and_then(|c| row[c].as_text()).map(str::to_string),
            board: board_c.and_then(|c| row[c].as_text()).map(str::to_string),
        })
        .collect()
}
