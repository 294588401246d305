//! Dataset ingestion: source adapters, schema normalization and validation.
//!
//! Every source funnels into the same shape: extract a [`RawTable`], run
//! [`normalize::normalize`] to canonicalize dates and tickers, then classify
//! the result with [`validate::validate`] before anything downstream sees it.

pub mod extract;
pub mod normalize;
pub mod scrape;
pub mod validate;

pub use extract::{CsvExtractor, Extractor, ExtractorRegistry, PasteExtractor, SourceKind, SourcePayload};
pub use normalize::{market_rows, normalize, normalize_ticker};
pub use scrape::{scrape_daily_bars, DailyBar, DailyBarProvider, YahooChartClient};
pub use validate::validate;

use ara_core::{AraError, Market, RawTable, ValidationReport};

/// Full ingestion pass for a byte/text payload: extract, normalize, validate.
pub fn ingest(
    registry: &ExtractorRegistry,
    kind: SourceKind,
    payload: &SourcePayload,
    market: &Market,
) -> Result<(RawTable, ValidationReport), AraError> {
    let mut table = registry.extract(kind, payload)?;
    normalize(&mut table, market);
    let report = validate(&table);
    Ok((table, report))
}
