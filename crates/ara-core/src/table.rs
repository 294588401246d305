use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Columns every dataset must carry to be scoreable.
pub const REQUIRED_COLS: [&str; 7] = ["Date", "Ticker", "Open", "High", "Low", "Close", "Volume"];

/// One cell of an ingested table. Extractors produce text/number cells;
/// the normalizer upgrades parseable Date cells to `Cell::Date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Date(NaiveDate),
    Text(String),
    Null,
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            Cell::Text(s) => s.trim().parse::<NaiveDate>().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        let t = s.trim();
        if t.is_empty() {
            Cell::Null
        } else {
            Cell::Text(t.to_string())
        }
    }
}

impl Cell {
    /// Parse a raw field the way ingestion adapters coerce values:
    /// empty -> null, numeric-looking -> number, otherwise text.
    pub fn parse(s: &str) -> Cell {
        let t = s.trim();
        if t.is_empty() {
            return Cell::Null;
        }
        match t.parse::<f64>() {
            Ok(v) if v.is_finite() => Cell::Number(v),
            _ => Cell::Text(t.to_string()),
        }
    }
}

/// A rectangular table with named columns, the common currency between
/// extraction, normalization, validation and feature construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Index of a column by exact name.
    pub fn col(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        &self.rows[row][col]
    }

    /// Push a row, padding or truncating to the column count.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Null);
        self.rows.push(row);
    }

    /// The maximum parsed Date cell, if any.
    pub fn latest_date(&self) -> Option<NaiveDate> {
        let c = self.col("Date")?;
        self.rows.iter().filter_map(|r| r[c].as_date()).max()
    }

    /// Keep only rows whose Date cell equals `date` (order-preserving).
    pub fn filter_date(&self, date: NaiveDate) -> RawTable {
        let mut out = RawTable::new(self.columns.clone());
        if let Some(c) = self.col("Date") {
            out.rows = self
                .rows
                .iter()
                .filter(|r| r[c].as_date() == Some(date))
                .cloned()
                .collect();
        }
        out
    }

    /// Serialize to a list of `{column: value}` records (persistence format).
    pub fn to_records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row.iter())
                    .map(|(name, cell)| {
                        (name.clone(), serde_json::to_value(cell).unwrap_or(serde_json::Value::Null))
                    })
                    .collect()
            })
            .collect()
    }

    /// Rebuild a table from `{column: value}` records, preserving `columns` order.
    pub fn from_records(
        columns: Vec<String>,
        records: &[serde_json::Map<String, serde_json::Value>],
    ) -> Self {
        let mut table = RawTable::new(columns);
        for rec in records {
            let row = table
                .columns
                .iter()
                .map(|name| match rec.get(name) {
                    None | Some(serde_json::Value::Null) => Cell::Null,
                    Some(v) => serde_json::from_value(v.clone()).unwrap_or(Cell::Null),
                })
                .collect();
            table.rows.push(row);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RawTable {
        let mut t = RawTable::new(vec!["Date".into(), "Ticker".into(), "Volume".into()]);
        t.push_row(vec![
            Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
            Cell::Text("BBCA.JK".into()),
            Cell::Number(1000.0),
        ]);
        t.push_row(vec![
            Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()),
            Cell::Text("BBCA.JK".into()),
            Cell::Number(1500.0),
        ]);
        t
    }

    #[test]
    fn latest_date_and_filter() {
        let t = table();
        let latest = t.latest_date().unwrap();
        assert_eq!(latest, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        let sliced = t.filter_date(latest);
        assert_eq!(sliced.len(), 1);
        assert_eq!(sliced.cell(0, 2).as_f64(), Some(1500.0));
    }

    #[test]
    fn records_roundtrip() {
        let t = table();
        let records = t.to_records();
        assert_eq!(records.len(), 2);
        let back = RawTable::from_records(t.columns.clone(), &records);
        assert_eq!(back.len(), 2);
        assert_eq!(back.cell(0, 0).as_date(), t.cell(0, 0).as_date());
        assert_eq!(back.cell(1, 2).as_f64(), Some(1500.0));
    }

    #[test]
    fn cell_coercions() {
        assert_eq!(Cell::from("  12.5 ").as_f64(), Some(12.5));
        assert!(Cell::from("   ").is_null());
        assert_eq!(
            Cell::Text("2024-06-01".into()).as_date(),
            NaiveDate::from_ymd_opt(2024, 6, 1)
        );
    }
}
