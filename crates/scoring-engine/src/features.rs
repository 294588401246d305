//! Feature-matrix construction. Inference engines are column-order
//! sensitive, so the frame keeps its column order fixed from construction.

use ara_core::{AraError, RawTable};

/// Identity/price columns that are never treated as features when the
/// bundle does not declare an explicit feature list.
pub const NON_FEATURE_COLS: [&str; 10] = [
    "Date", "Ticker", "Nama", "Papan", "Open", "High", "Low", "Close", "AdjClose", "Volume",
];

/// Row-major f32 matrix with named, ordered columns.
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    names: Vec<String>,
    data: Vec<f32>,
    rows: usize,
}

impl FeatureFrame {
    pub fn from_rows(names: Vec<String>, rows: Vec<Vec<f32>>) -> Self {
        let n = rows.len();
        let width = names.len();
        let mut data = Vec::with_capacity(n * width);
        for mut row in rows {
            row.resize(width, f32::NAN);
            data.extend(row);
        }
        Self {
            names,
            data,
            rows: n,
        }
    }

    /// Build the scoring matrix from a table. With a bundle-declared list
    /// the columns are taken in exactly that order and every name must be
    /// present; otherwise every column outside [`NON_FEATURE_COLS`] is a
    /// feature, in table order. Cells that fail numeric coercion become NaN.
    pub fn from_table(table: &RawTable, required: Option<&[String]>) -> Result<Self, AraError> {
        let selected: Vec<(String, usize)> = match required {
            Some(names) => {
                let missing: Vec<String> = names
                    .iter()
                    .filter(|n| table.col(n).is_none())
                    .cloned()
                    .collect();
                if !missing.is_empty() {
                    return Err(AraError::feature_mismatch(missing));
                }
                names
                    .iter()
                    .filter_map(|n| Some((n.clone(), table.col(n)?)))
                    .collect()
            }
            None => table
                .columns
                .iter()
                .enumerate()
                .filter(|(_, name)| !NON_FEATURE_COLS.contains(&name.as_str()))
                .map(|(idx, name)| (name.clone(), idx))
                .collect(),
        };
        if selected.is_empty() {
            return Err(AraError::Scoring("no feature columns in input".into()));
        }

        let names: Vec<String> = selected.iter().map(|(n, _)| n.clone()).collect();
        let mut data = Vec::with_capacity(table.len() * selected.len());
        for row in &table.rows {
            for (_, idx) in &selected {
                data.push(row[*idx].as_f64().map(|v| v as f32).unwrap_or(f32::NAN));
            }
        }
        Ok(Self {
            rows: table.len(),
            names,
            data,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }

    pub fn num_features(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn row(&self, i: usize) -> &[f32] {
        let w = self.names.len();
        &self.data[i * w..(i + 1) * w]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ara_core::Cell;

    fn table() -> RawTable {
        let mut t = RawTable::new(vec![
            "Date".into(),
            "Ticker".into(),
            "Close".into(),
            "ret_1d".into(),
            "vol_z".into(),
        ]);
        t.push_row(vec![
            Cell::Text("2024-01-02".into()),
            Cell::Text("BBCA.JK".into()),
            Cell::Number(9100.0),
            Cell::Number(0.015),
            Cell::Number(1.2),
        ]);
        t.push_row(vec![
            Cell::Text("2024-01-02".into()),
            Cell::Text("TLKM.JK".into()),
            Cell::Number(3900.0),
            Cell::Null,
            Cell::Text("oops".into()),
        ]);
        t
    }

    #[test]
    fn infers_features_by_exclusion() {
        let frame = FeatureFrame::from_table(&table(), None).unwrap();
        assert_eq!(frame.names(), &["ret_1d".to_string(), "vol_z".to_string()]);
        assert_eq!(frame.num_rows(), 2);
        assert_eq!(frame.row(0), &[0.015f32, 1.2f32]);
        assert!(frame.row(1)[0].is_nan());
        assert!(frame.row(1)[1].is_nan());
    }

    #[test]
    fn honors_bundle_order() {
        let required = vec!["vol_z".to_string(), "ret_1d".to_string()];
        let frame = FeatureFrame::from_table(&table(), Some(&required)).unwrap();
        assert_eq!(frame.names(), &["vol_z".to_string(), "ret_1d".to_string()]);
        assert_eq!(frame.row(0), &[1.2f32, 0.015f32]);
    }

    #[test]
    fn missing_required_features_reports_ten_plus_total() {
        let required: Vec<String> = (0..15).map(|i| format!("feat_{i}")).collect();
        let err = FeatureFrame::from_table(&table(), Some(&required)).unwrap_err();
        match err {
            AraError::FeatureMismatch { shown, total } => {
                assert_eq!(shown.len(), 10);
                assert_eq!(total, 15);
                assert_eq!(shown[0], "feat_0");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn all_identity_columns_means_no_features() {
        let t = RawTable::new(vec!["Date".into(), "Ticker".into(), "Close".into()]);
        assert!(matches!(
            FeatureFrame::from_table(&t, None),
            Err(AraError::Scoring(_))
        ));
    }
}
