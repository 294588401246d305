//! The combined screen: board/watchlist exclusion AND liquidity floor.
//! Both predicates are independent, so application order never changes the
//! result — this is a pure set intersection over the input rows.

use ara_core::ScoredRow;

/// Board tag marking special regulatory monitoring status.
pub const WATCHLIST_BOARD: &str = "pemantauan khusus";

/// Order-preserving filter. A missing board value counts as the empty
/// string (always passes); a missing liquidity rank counts as 0 and fails
/// any positive floor.
pub fn screen(rows: &[ScoredRow], exclude_watchlist: bool, liquidity_floor: f64) -> Vec<ScoredRow> {
    rows.iter()
        .filter(|row| {
            let board_ok = !exclude_watchlist
                || row
                    .board
                    .as_deref()
                    .unwrap_or("")
                    .trim()
                    .to_lowercase()
                    != WATCHLIST_BOARD;
            let liq_ok = row.vol_rank_day.unwrap_or(0.0) >= liquidity_floor;
            board_ok && liq_ok
        })
        .cloned()
        .collect()
}

/// Sort by probability, highest first. Ties break on ticker so repeated
/// runs produce identical rankings.
pub fn rank_descending(rows: &mut [ScoredRow]) {
    rows.sort_by(|a, b| {
        b.proba
            .partial_cmp(&a.proba)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
}

pub fn top_k(rows: &[ScoredRow], k: usize) -> Vec<ScoredRow> {
    rows.iter().take(k).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(ticker: &str, proba: f64, rank: Option<f64>, board: Option<&str>) -> ScoredRow {
        ScoredRow {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            ticker: ticker.to_string(),
            proba,
            vol_rank_day: rank,
            name: None,
            board: board.map(str::to_string),
        }
    }

    #[test]
    fn and_composition_of_board_and_liquidity() {
        let rows = vec![
            row("AAAA.JK", 0.9, Some(0.9), Some("Utama")),
            row("BBBB.JK", 0.8, Some(0.4), Some("Utama")),
            row("CCCC.JK", 0.7, Some(0.6), Some("Pemantauan Khusus")),
        ];
        let kept = screen(&rows, true, 0.5);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].ticker, "AAAA.JK");
    }

    #[test]
    fn board_filter_off_keeps_watchlist_rows() {
        let rows = vec![row("CCCC.JK", 0.7, Some(0.6), Some("Pemantauan Khusus"))];
        assert_eq!(screen(&rows, false, 0.5).len(), 1);
    }

    #[test]
    fn board_comparison_is_case_insensitive_null_as_empty() {
        let rows = vec![
            row("AAAA.JK", 0.9, Some(0.9), Some("PEMANTAUAN KHUSUS")),
            row("BBBB.JK", 0.8, Some(0.9), None),
        ];
        let kept = screen(&rows, true, 0.0);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].ticker, "BBBB.JK");
    }

    #[test]
    fn missing_liquidity_rank_fails_any_positive_floor() {
        let rows = vec![row("AAAA.JK", 0.99, None, None)];
        assert!(screen(&rows, true, 0.1).is_empty());
        // and passes a zero floor
        assert_eq!(screen(&rows, true, 0.0).len(), 1);
    }

    #[test]
    fn rank_is_descending_with_ticker_tiebreak() {
        let mut rows = vec![
            row("ZZZZ.JK", 0.5, None, None),
            row("AAAA.JK", 0.5, None, None),
            row("MMMM.JK", 0.9, None, None),
        ];
        rank_descending(&mut rows);
        let order: Vec<&str> = rows.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(order, vec!["MMMM.JK", "AAAA.JK", "ZZZZ.JK"]);
    }

    #[test]
    fn top_k_truncates() {
        let mut rows = vec![
            row("A.JK", 0.1, None, None),
            row("B.JK", 0.9, None, None),
            row("C.JK", 0.5, None, None),
        ];
        rank_descending(&mut rows);
        let top = top_k(&rows, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].ticker, "B.JK");
    }
}
