//! Live scraping of daily bars. The provider behind the HTTP call is a
//! trait so tests can swap in a canned source.

use crate::normalize::normalize_ticker;
use ara_core::{AraError, Cell, Market, RawTable};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Clone)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[async_trait]
pub trait DailyBarProvider: Send + Sync {
    /// Recent daily bars for one (already normalized) ticker.
    async fn daily_bars(&self, ticker: &str, days: u32) -> anyhow::Result<Vec<DailyBar>>;
}

/// Yahoo Finance chart API provider.
#[derive(Clone)]
pub struct YahooChartClient {
    client: reqwest::Client,
}

impl Default for YahooChartClient {
    fn default() -> Self {
        Self::new()
    }
}

impl YahooChartClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }
}

#[async_trait]
impl DailyBarProvider for YahooChartClient {
    async fn daily_bars(&self, ticker: &str, days: u32) -> anyhow::Result<Vec<DailyBar>> {
        let url = format!("{CHART_URL}/{ticker}?range={days}d&interval=1d");
        let response = self.client.get(&url).send().await?;
        let json: serde_json::Value = response.json().await?;

        let result = json
            .get("chart")
            .and_then(|v| v.get("result"))
            .and_then(|v| v.as_array())
            .and_then(|arr| arr.first())
            .ok_or_else(|| anyhow::anyhow!("no chart data for {ticker}"))?;

        let timestamps = result
            .get("timestamp")
            .and_then(|v| v.as_array())
            .ok_or_else(|| anyhow::anyhow!("no timestamps for {ticker}"))?;
        let quote = result
            .get("indicators")
            .and_then(|v| v.get("quote"))
            .and_then(|v| v.as_array())
            .and_then(|arr| arr.first())
            .ok_or_else(|| anyhow::anyhow!("no quote block for {ticker}"))?;

        let series = |key: &str| -> Vec<Option<f64>> {
            quote
                .get(key)
                .and_then(|v| v.as_array())
                .map(|arr| arr.iter().map(|v| v.as_f64()).collect())
                .unwrap_or_default()
        };
        let (open, high, low, close, volume) = (
            series("open"),
            series("high"),
            series("low"),
            series("close"),
            series("volume"),
        );

        let mut bars = Vec::new();
        for (i, ts) in timestamps.iter().enumerate() {
            let Some(secs) = ts.as_i64() else { continue };
            let Some(date) = DateTime::<Utc>::from_timestamp(secs, 0).map(|dt| dt.date_naive())
            else {
                continue;
            };
            let get = |s: &[Option<f64>]| s.get(i).copied().flatten();
            let (Some(o), Some(h), Some(l), Some(c)) =
                (get(&open), get(&high), get(&low), get(&close))
            else {
                continue;
            };
            bars.push(DailyBar {
                date,
                open: o,
                high: h,
                low: l,
                close: c,
                volume: get(&volume).unwrap_or(0.0),
            });
        }
        Ok(bars)
    }
}

/// Pull the last few daily bars for each ticker and assemble the canonical
/// table. Individual ticker failures are skipped; an entirely empty pull is
/// an extraction failure.
pub async fn scrape_daily_bars(
    provider: &dyn DailyBarProvider,
    tickers: &[String],
    market: &Market,
) -> Result<RawTable, AraError> {
    if tickers.is_empty() {
        return Err(AraError::Extraction("tickers required for scraping".into()));
    }

    let mut table = RawTable::new(
        ["Date", "Ticker", "Open", "High", "Low", "Close", "Volume", "AdjClose"]
            .into_iter()
            .map(String::from)
            .collect(),
    );

    for raw in tickers {
        let ticker = normalize_ticker(raw, market);
        match provider.daily_bars(&ticker, 5).await {
            Ok(bars) => {
                for bar in bars {
                    table.push_row(vec![
                        Cell::Date(bar.date),
                        Cell::Text(ticker.clone()),
                        Cell::Number(bar.open),
                        Cell::Number(bar.high),
                        Cell::Number(bar.low),
                        Cell::Number(bar.close),
                        Cell::Number(bar.volume),
                        Cell::Number(bar.close),
                    ]);
                }
            }
            Err(e) => {
                tracing::warn!(ticker, error = %e, "scrape failed for ticker, skipping");
            }
        }
    }

    if table.is_empty() {
        return Err(AraError::Extraction("no data retrieved from provider".into()));
    }
    Ok(table)
}
