use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Classification tag carried by every emitted alert.
pub const ALERT_KIND: &str = "ara_candidate";

/// Target market for ticker normalization and screening defaults.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Market {
    Id,
    Us,
    Other(String),
}

impl Default for Market {
    fn default() -> Self {
        Market::Id
    }
}

impl Market {
    pub fn as_str(&self) -> &str {
        match self {
            Market::Id => "ID",
            Market::Us => "US",
            Market::Other(s) => s,
        }
    }
}

impl From<String> for Market {
    fn from(s: String) -> Self {
        match s.trim().to_uppercase().as_str() {
            "ID" | "" => Market::Id,
            "US" => Market::Us,
            other => Market::Other(other.to_string()),
        }
    }
}

impl From<Market> for String {
    fn from(m: Market) -> Self {
        m.as_str().to_string()
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One canonical daily bar after schema normalization.
/// (date, ticker) is the natural dedup key; first occurrence wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketRow {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "Open")]
    pub open: f64,
    #[serde(rename = "High")]
    pub high: f64,
    #[serde(rename = "Low")]
    pub low: f64,
    #[serde(rename = "Close")]
    pub close: f64,
    #[serde(rename = "Volume")]
    pub volume: f64,
    #[serde(rename = "AdjClose", default, skip_serializing_if = "Option::is_none")]
    pub adj_close: Option<f64>,
    #[serde(rename = "Papan", default, skip_serializing_if = "Option::is_none")]
    pub board: Option<String>,
}

/// A scored entity: identity plus the calibrated ensemble probability and
/// the optional per-day liquidity rank used by screening.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredRow {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "proba_ARA_t1")]
    pub proba: f64,
    #[serde(default)]
    pub vol_rank_day: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "Papan", default, skip_serializing_if = "Option::is_none")]
    pub board: Option<String>,
}

/// A threshold-crossing event handed to the delivery queue.
/// Transient: consumed exactly once, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub ticker: String,
    pub proba: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    pub market: Market,
    pub asof: NaiveDate,
}

/// Validation outcome for an ingested dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Error,
    Warning,
    Valid,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Error => "error",
            ValidationStatus::Warning => "warning",
            ValidationStatus::Valid => "valid",
        }
    }
}

/// Structured diagnostic notes accumulated by the validator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationNotes {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub status: ValidationStatus,
    pub notes: ValidationNotes,
}
