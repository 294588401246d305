use ara_core::{Alert, Market, ScoredRow, ALERT_KIND};
use chrono::NaiveDate;

/// One alert per screened row at or above the threshold. The comparison is
/// inclusive: `proba == threshold` fires. No deduplication happens here —
/// re-scoring the same data re-emits (identity key left to product).
pub fn emit(rows: &[ScoredRow], threshold: f64, market: &Market, asof: NaiveDate) -> Vec<Alert> {
    rows.iter()
        .filter(|row| row.proba >= threshold)
        .map(|row| Alert {
            ticker: row.ticker.clone(),
            proba: row.proba,
            timestamp: chrono::Utc::now(),
            kind: ALERT_KIND.to_string(),
            market: market.clone(),
            asof,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(ticker: &str, proba: f64) -> ScoredRow {
        ScoredRow {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            ticker: ticker.to_string(),
            proba,
            vol_rank_day: None,
            name: None,
            board: None,
        }
    }

    #[test]
    fn threshold_is_inclusive_one_ulp_below_is_not() {
        let threshold = 0.8f64;
        let just_below = f64::from_bits(threshold.to_bits() - 1);
        let rows = vec![row("EXACT.JK", threshold), row("BELOW.JK", just_below)];
        let asof = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();

        let alerts = emit(&rows, threshold, &Market::Id, asof);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].ticker, "EXACT.JK");
    }

    #[test]
    fn alert_carries_context() {
        let asof = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let alerts = emit(&[row("BBCA.JK", 0.95)], 0.8, &Market::Id, asof);
        assert_eq!(alerts[0].kind, ALERT_KIND);
        assert_eq!(alerts[0].market, Market::Id);
        assert_eq!(alerts[0].asof, asof);
        assert_eq!(alerts[0].proba, 0.95);
    }

    #[test]
    fn nothing_below_threshold_emits() {
        let asof = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert!(emit(&[row("A.JK", 0.1), row("B.JK", 0.79)], 0.8, &Market::Id, asof).is_empty());
    }
}
