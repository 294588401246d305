//! Dataset validation: classifies a normalized table as valid/warning/error.
//!
//! Pure classification — every condition lands in the returned report, the
//! function itself never fails.

use ara_core::{Cell, RawTable, ValidationNotes, ValidationReport, ValidationStatus, REQUIRED_COLS};
use chrono::NaiveDate;
use std::collections::HashSet;

pub fn validate(table: &RawTable) -> ValidationReport {
    let mut notes = ValidationNotes::default();

    if table.is_empty() {
        notes.errors.push("Dataset is empty".to_string());
        return ValidationReport {
            status: ValidationStatus::Error,
            notes,
        };
    }

    let missing: Vec<&str> = REQUIRED_COLS
        .iter()
        .filter(|c| table.col(c).is_none())
        .copied()
        .collect();
    if !missing.is_empty() {
        notes
            .errors
            .push(format!("Missing required columns: {missing:?}"));
        return ValidationReport {
            status: ValidationStatus::Error,
            notes,
        };
    }

    let total = table.len();
    for (col, idx) in REQUIRED_COLS.iter().filter_map(|c| Some((*c, table.col(c)?))) {
        let nulls = table.rows.iter().filter(|r| r[idx].is_null()).count();
        if nulls > 0 {
            let pct = nulls as f64 / total as f64 * 100.0;
            let note = format!("{col} has {nulls} null values ({pct:.1}%)");
            if col == "Date" || col == "Ticker" {
                notes.errors.push(note);
            } else {
                notes.warnings.push(note);
            }
        }
    }

    if !notes.errors.is_empty() {
        return ValidationReport {
            status: ValidationStatus::Error,
            notes,
        };
    }

    // Key columns are complete from here; audit duplicates with
    // keep-first semantics and collect the summary stats.
    let (Some(date_c), Some(ticker_c)) = (table.col("Date"), table.col("Ticker")) else {
        return ValidationReport {
            status: ValidationStatus::Error,
            notes,
        };
    };
    let mut seen: HashSet<(NaiveDate, &str)> = HashSet::new();
    let mut dupes = 0usize;
    let mut min_date: Option<NaiveDate> = None;
    let mut max_date: Option<NaiveDate> = None;
    let mut tickers: HashSet<&str> = HashSet::new();
    let mut kept = 0usize;

    for row in &table.rows {
        let (Some(date), Some(ticker)) = (row[date_c].as_date(), cell_text(&row[ticker_c])) else {
            continue;
        };
        kept += 1;
        if !seen.insert((date, ticker)) {
            dupes += 1;
        }
        tickers.insert(ticker);
        min_date = Some(min_date.map_or(date, |d| d.min(date)));
        max_date = Some(max_date.map_or(date, |d| d.max(date)));
    }

    if dupes > 0 {
        notes.warnings.push(format!(
            "Found {dupes} duplicate (Date, Ticker) pairs - keeping first occurrence"
        ));
    }

    if let (Some(lo), Some(hi)) = (min_date, max_date) {
        notes.info.push(format!("Date range: {lo} to {hi}"));
    }
    notes.info.push(format!("Unique tickers: {}", tickers.len()));
    notes.info.push(format!("Total rows: {kept}"));

    let status = if notes.warnings.is_empty() {
        ValidationStatus::Valid
    } else {
        ValidationStatus::Warning
    };
    ValidationReport { status, notes }
}

fn cell_text(cell: &Cell) -> Option<&str> {
    match cell {
        Cell::Text(s) => Some(s.as_str()),
        _ => None,
    }
}
