//! Liquidity rank: percentile rank of raw trading volume within a single
//! day's cross-section. Ties share the average of their positions. This is
//! a batch-relative statistic, recomputed per scoring call, never persisted.

use ara_core::ScoredRow;
use std::collections::HashMap;

/// Average-percentile rank per ticker for one day's (ticker, volume) pairs.
/// Non-finite volumes get no rank; duplicate tickers keep their first value.
pub fn vol_rank_day(volumes: &[(String, f64)]) -> HashMap<String, f64> {
    let mut first: Vec<(&str, f64)> = Vec::with_capacity(volumes.len());
    {
        let mut seen = std::collections::HashSet::new();
        for (ticker, vol) in volumes {
            if vol.is_finite() && seen.insert(ticker.as_str()) {
                first.push((ticker.as_str(), *vol));
            }
        }
    }
    let n = first.len();
    if n == 0 {
        return HashMap::new();
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        first[a]
            .1
            .partial_cmp(&first[b].1)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = HashMap::with_capacity(n);
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && first[order[j + 1]].1 == first[order[i]].1 {
            j += 1;
        }
        // 1-based positions i+1 ..= j+1 share their mean rank
        let avg_rank = (i + j + 2) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks.insert(first[idx].0.to_string(), avg_rank / n as f64);
        }
        i = j + 1;
    }
    ranks
}

/// Left-join the day ranks onto scored rows; tickers without a rank stay None.
pub fn attach_vol_rank(rows: &mut [ScoredRow], ranks: &HashMap<String, f64>) {
    for row in rows {
        row.vol_rank_day = ranks.get(&row.ticker).copied();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(v: &[(&str, f64)]) -> Vec<(String, f64)> {
        v.iter().map(|(t, x)| (t.to_string(), *x)).collect()
    }

    #[test]
    fn percentile_with_ties_averaged() {
        // volumes [10, 20, 20, 30] -> ranks [1, 2.5, 2.5, 4] -> pct [.25, .625, .625, 1.0]
        let ranks = vol_rank_day(&pairs(&[("A", 10.0), ("B", 20.0), ("C", 20.0), ("D", 30.0)]));
        assert!((ranks["A"] - 0.25).abs() < 1e-12);
        assert!((ranks["B"] - 0.625).abs() < 1e-12);
        assert!((ranks["C"] - 0.625).abs() < 1e-12);
        assert!((ranks["D"] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn singleton_ranks_at_one() {
        let ranks = vol_rank_day(&pairs(&[("A", 5.0)]));
        assert_eq!(ranks["A"], 1.0);
    }

    #[test]
    fn nan_volume_gets_no_rank_and_first_ticker_wins() {
        let ranks = vol_rank_day(&pairs(&[("A", f64::NAN), ("B", 2.0), ("B", 99.0), ("C", 1.0)]));
        assert!(!ranks.contains_key("A"));
        assert!((ranks["B"] - 1.0).abs() < 1e-12);
        assert!((ranks["C"] - 0.5).abs() < 1e-12);
    }
}
