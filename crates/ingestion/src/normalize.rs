//! Schema canonicalization: date/timezone handling and ticker symbols.
//!
//! Pure functions over the input table — unparseable dates become nulls for
//! the validator to report, never silently dropped rows.

use ara_core::{Cell, Market, MarketRow, RawTable};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::HashSet;

/// Trim + uppercase; market ID appends the ".JK" exchange suffix unless the
/// symbol already carries it. Other markets have no suffix rule.
pub fn normalize_ticker(raw: &str, market: &Market) -> String {
    let ticker = raw.trim().to_uppercase();
    match market {
        Market::Id if !ticker.ends_with(".JK") => format!("{ticker}.JK"),
        _ => ticker,
    }
}

/// Parse a date string. Timezone-aware timestamps are converted to UTC
/// before truncating to the calendar date.
fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let t = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(t, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(t, fmt) {
            return Some(d);
        }
    }
    None
}

/// Canonicalize the Date and Ticker columns in place.
pub fn normalize(table: &mut RawTable, market: &Market) {
    if let Some(c) = table.col("Date") {
        for row in &mut table.rows {
            row[c] = match &row[c] {
                Cell::Date(d) => Cell::Date(*d),
                Cell::Text(s) => match parse_date_str(s) {
                    Some(d) => Cell::Date(d),
                    None => Cell::Null,
                },
                _ => Cell::Null,
            };
        }
    }
    if let Some(c) = table.col("Ticker") {
        for row in &mut table.rows {
            row[c] = match &row[c] {
                Cell::Text(s) => Cell::Text(normalize_ticker(s, market)),
                // numeric-looking issuer codes come out of the adapters as numbers
                Cell::Number(n) if n.fract() == 0.0 => {
                    Cell::Text(normalize_ticker(&format!("{n:.0}"), market))
                }
                other => other.clone(),
            };
        }
    }
}

/// Convert a normalized table into canonical rows, dropping rows with null
/// keys and deduplicating on (date, ticker) with first-occurrence-wins.
pub fn market_rows(table: &RawTable) -> Vec<MarketRow> {
    let (Some(date_c), Some(ticker_c)) = (table.col("Date"), table.col("Ticker")) else {
        return Vec::new();
    };
    let num = |row: &[Cell], name: &str| -> f64 {
        table
            .col(name)
            .and_then(|c| row[c].as_f64())
            .unwrap_or(f64::NAN)
    };

    let mut seen: HashSet<(NaiveDate, String)> = HashSet::new();
    let mut out = Vec::new();
    for row in &table.rows {
        let (Some(date), Some(ticker)) = (row[date_c].as_date(), row[ticker_c].as_text()) else {
            continue;
        };
        if !seen.insert((date, ticker.to_string())) {
            continue;
        }
        out.push(MarketRow {
            date,
            ticker: ticker.to_string(),
            open: num(row, "Open"),
            high: num(row, "High"),
            low: num(row, "Low"),
            close: num(row, "Close"),
            volume: num(row, "Volume"),
            adj_close: table.col("AdjClose").and_then(|c| row[c].as_f64()),
            board: table
                .col("Papan")
                .and_then(|c| row[c].as_text())
                .map(str::to_string),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_gets_suffix_for_id_market() {
        assert_eq!(normalize_ticker(" bbca ", &Market::Id), "BBCA.JK");
    }

    #[test]
    fn ticker_suffix_not_doubled() {
        assert_eq!(normalize_ticker("BBCA.JK", &Market::Id), "BBCA.JK");
        assert_eq!(normalize_ticker("bbca.jk", &Market::Id), "BBCA.JK");
    }

    #[test]
    fn other_markets_pass_through() {
        assert_eq!(normalize_ticker(" aapl ", &Market::Us), "AAPL");
    }

    #[test]
    fn tz_aware_timestamp_truncates_in_utc() {
        // 01:30 Jakarta (UTC+7) on Jan 2 is still Jan 1 in UTC
        assert_eq!(
            parse_date_str("2024-01-02T01:30:00+07:00"),
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
        assert_eq!(parse_date_str("2024-01-02"), NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(parse_date_str("31/01/2024"), NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(parse_date_str("not a date"), None);
    }

    #[test]
    fn unparseable_dates_become_null() {
        let mut t = RawTable::new(vec!["Date".into(), "Ticker".into()]);
        t.push_row(vec![Cell::Text("2024-01-02".into()), Cell::Text("bbca".into())]);
        t.push_row(vec![Cell::Text("??".into()), Cell::Text("tlkm".into())]);
        normalize(&mut t, &Market::Id);
        assert_eq!(t.cell(0, 0).as_date(), NaiveDate::from_ymd_opt(2024, 1, 2));
        assert!(t.cell(1, 0).is_null());
        assert_eq!(t.cell(0, 1).as_text(), Some("BBCA.JK"));
    }

    #[test]
    fn market_rows_keep_first_on_duplicates() {
        let mut t = RawTable::new(vec![
            "Date".into(),
            "Ticker".into(),
            "Open".into(),
            "High".into(),
            "Low".into(),
            "Close".into(),
            "Volume".into(),
        ]);
        let d = Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        t.push_row(vec![
            d.clone(),
            Cell::Text("BBCA.JK".into()),
            Cell::Number(1.0),
            Cell::Number(2.0),
            Cell::Number(0.5),
            Cell::Number(1.5),
            Cell::Number(100.0),
        ]);
        t.push_row(vec![
            d.clone(),
            Cell::Text("BBCA.JK".into()),
            Cell::Number(9.0),
            Cell::Number(9.0),
            Cell::Number(9.0),
            Cell::Number(9.0),
            Cell::Number(900.0),
        ]);
        let rows = market_rows(&t);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].open, 1.0);
    }
}
