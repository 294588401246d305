//! SQLite persistence for ingested datasets and alert schedules.
//!
//! Datasets are stored whole (records JSON) keyed by a UUID, so a scoring
//! call can replay exactly what was ingested. Schedules carry their own
//! next-run bookkeeping; the scheduler polls `due_schedules`.

use ara_core::{AraError, Market, RawTable, ValidationNotes, ValidationReport};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: String,
    pub market: Market,
    pub source_type: String,
    pub source_name: String,
    pub asof_date: Option<NaiveDate>,
    pub row_count: i64,
    pub ticker_count: i64,
    pub validation_status: String,
    pub validation_notes: ValidationNotes,
    pub table: RawTable,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub id: String,
    pub source_type: String,
    pub source_name: String,
    pub row_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSchedule {
    pub id: String,
    pub market: Market,
    pub run_at_local: String,
    pub tz_offset_minutes: i32,
    pub k: i64,
    pub liq: f64,
    pub exclude_watchlist: bool,
    pub channels: Vec<String>,
    pub is_active: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct DatasetStore {
    pool: SqlitePool,
}

fn store_err(e: impl std::fmt::Display) -> AraError {
    AraError::Store(e.to_string())
}

impl DatasetStore {
    pub async fn connect(path: &str) -> Result<Self, AraError> {
        let pool = SqlitePool::connect(&format!("sqlite:{path}?mode=rwc"))
            .await
            .map_err(store_err)?;
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await
            .map_err(store_err)?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Single-connection in-memory store, used by tests.
    pub async fn in_memory() -> Result<Self, AraError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(store_err)?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), AraError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS datasets (
                id TEXT PRIMARY KEY,
                market TEXT NOT NULL,
                source_type TEXT NOT NULL,
                source_name TEXT NOT NULL,
                asof_date TEXT,
                row_count INTEGER NOT NULL,
                ticker_count INTEGER NOT NULL,
                validation_status TEXT NOT NULL,
                validation_notes TEXT NOT NULL,
                columns TEXT NOT NULL,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS alert_schedules (
                id TEXT PRIMARY KEY,
                market TEXT NOT NULL,
                run_at_local TEXT NOT NULL,
                tz_offset_minutes INTEGER NOT NULL,
                k INTEGER NOT NULL,
                liq REAL NOT NULL,
                exclude_watchlist INTEGER NOT NULL,
                channels TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                last_run TEXT,
                next_run TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    pub async fn save_dataset(
        &self,
        table: &RawTable,
        source_type: &str,
        source_name: &str,
        market: &Market,
        report: &ValidationReport,
        asof_date: Option<NaiveDate>,
    ) -> Result<String, AraError> {
        let id = uuid::Uuid::new_v4().to_string();
        let asof = asof_date.or_else(|| table.latest_date());
        let ticker_count = match table.col("Ticker") {
            Some(c) => {
                let unique: std::collections::HashSet<_> = table
                    .rows
                    .iter()
                    .filter_map(|r| r[c].as_text())
                    .collect();
                unique.len() as i64
            }
            None => 0,
        };
        let notes_json = serde_json::to_string(&report.notes).map_err(store_err)?;
        let columns_json = serde_json::to_string(&table.columns).map_err(store_err)?;
        let data_json = serde_json::to_string(&table.to_records()).map_err(store_err)?;

        sqlx::query(
            r#"
            INSERT INTO datasets
                (id, market, source_type, source_name, asof_date, row_count, ticker_count,
                 validation_status, validation_notes, columns, data, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(market.as_str())
        .bind(source_type)
        .bind(source_name)
        .bind(asof)
        .bind(table.len() as i64)
        .bind(ticker_count)
        .bind(report.status.as_str())
        .bind(notes_json)
        .bind(columns_json)
        .bind(data_json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        tracing::info!(dataset_id = %id, source = source_type, rows = table.len(), "dataset persisted");
        Ok(id)
    }

    pub async fn get_dataset(&self, id: &str) -> Result<Option<DatasetRecord>, AraError> {
        let row = sqlx::query("SELECT * FROM datasets WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.map(|r| record_from_row(&r)).transpose()
    }

    /// Most recently ingested dataset for a market, optionally restricted
    /// to one source type.
    pub async fn latest_dataset(
        &self,
        market: &Market,
        source_type: Option<&str>,
    ) -> Result<Option<DatasetRecord>, AraError> {
        let row = match source_type {
            Some(st) => {
                sqlx::query(
                    "SELECT * FROM datasets WHERE market = ? AND source_type = ? \
                     ORDER BY created_at DESC LIMIT 1",
                )
                .bind(market.as_str())
                .bind(st)
                .fetch_optional(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT * FROM datasets WHERE market = ? ORDER BY created_at DESC LIMIT 1",
                )
                .bind(market.as_str())
                .fetch_optional(&self.pool)
                .await
            }
        }
        .map_err(store_err)?;
        row.map(|r| record_from_row(&r)).transpose()
    }

    pub async fn datasets_by_date(
        &self,
        market: &Market,
        asof: NaiveDate,
    ) -> Result<Vec<DatasetSummary>, AraError> {
        let rows = sqlx::query(
            "SELECT id, source_type, source_name, row_count, created_at FROM datasets \
             WHERE market = ? AND asof_date = ? ORDER BY created_at DESC",
        )
        .bind(market.as_str())
        .bind(asof)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.iter()
            .map(|r| {
                Ok(DatasetSummary {
                    id: r.try_get("id").map_err(store_err)?,
                    source_type: r.try_get("source_type").map_err(store_err)?,
                    source_name: r.try_get("source_name").map_err(store_err)?,
                    row_count: r.try_get("row_count").map_err(store_err)?,
                    created_at: r.try_get("created_at").map_err(store_err)?,
                })
            })
            .collect()
    }

    pub async fn create_schedule(
        &self,
        market: &Market,
        run_at_local: &str,
        tz_offset_minutes: i32,
        k: i64,
        liq: f64,
        exclude_watchlist: bool,
        channels: &[String],
        next_run: DateTime<Utc>,
    ) -> Result<String, AraError> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO alert_schedules
                (id, market, run_at_local, tz_offset_minutes, k, liq, exclude_watchlist,
                 channels, is_active, last_run, next_run, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, NULL, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(market.as_str())
        .bind(run_at_local)
        .bind(tz_offset_minutes)
        .bind(k)
        .bind(liq)
        .bind(exclude_watchlist)
        .bind(serde_json::to_string(channels).map_err(store_err)?)
        .bind(next_run)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(id)
    }

    /// Active schedules whose next_run is at or before `now`.
    pub async fn due_schedules(&self, now: DateTime<Utc>) -> Result<Vec<AlertSchedule>, AraError> {
        let rows = sqlx::query(
            "SELECT * FROM alert_schedules WHERE is_active = 1 AND next_run <= ?",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.iter().map(schedule_from_row).collect()
    }

    pub async fn mark_schedule_run(
        &self,
        id: &str,
        next_run: DateTime<Utc>,
    ) -> Result<(), AraError> {
        sqlx::query("UPDATE alert_schedules SET last_run = ?, next_run = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(next_run)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }
}

fn record_from_row(r: &sqlx::sqlite::SqliteRow) -> Result<DatasetRecord, AraError> {
    let columns: Vec<String> =
        serde_json::from_str(&r.try_get::<String, _>("columns").map_err(store_err)?)
            .map_err(store_err)?;
    let records: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_str(&r.try_get::<String, _>("data").map_err(store_err)?)
            .map_err(store_err)?;
    let notes: ValidationNotes =
        serde_json::from_str(&r.try_get::<String, _>("validation_notes").map_err(store_err)?)
            .map_err(store_err)?;

    Ok(DatasetRecord {
        id: r.try_get("id").map_err(store_err)?,
        market: Market::from(r.try_get::<String, _>("market").map_err(store_err)?),
        source_type: r.try_get("source_type").map_err(store_err)?,
        source_name: r.try_get("source_name").map_err(store_err)?,
        asof_date: r.try_get("asof_date").map_err(store_err)?,
        row_count: r.try_get("row_count").map_err(store_err)?,
        ticker_count: r.try_get("ticker_count").map_err(store_err)?,
        validation_status: r.try_get("validation_status").map_err(store_err)?,
        validation_notes: notes,
        table: RawTable::from_records(columns, &records),
        created_at: r.try_get("created_at").map_err(store_err)?,
    })
}

fn schedule_from_row(r: &sqlx::sqlite::SqliteRow) -> Result<AlertSchedule, AraError> {
    let channels: Vec<String> =
        serde_json::from_str(&r.try_get::<String, _>("channels").map_err(store_err)?)
            .map_err(store_err)?;
    Ok(AlertSchedule {
        id: r.try_get("id").map_err(store_err)?,
        market: Market::from(r.try_get::<String, _>("market").map_err(store_err)?),
        run_at_local: r.try_get("run_at_local").map_err(store_err)?,
        tz_offset_minutes: r.try_get("tz_offset_minutes").map_err(store_err)?,
        k: r.try_get("k").map_err(store_err)?,
        liq: r.try_get("liq").map_err(store_err)?,
        exclude_watchlist: r.try_get("exclude_watchlist").map_err(store_err)?,
        channels,
        is_active: r.try_get("is_active").map_err(store_err)?,
        last_run: r.try_get("last_run").map_err(store_err)?,
        next_run: r.try_get("next_run").map_err(store_err)?,
        created_at: r.try_get("created_at").map_err(store_err)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ara_core::{Cell, ValidationStatus};
    use chrono::Duration;

    fn sample_table() -> RawTable {
        let mut t = RawTable::new(vec![
            "Date".into(),
            "Ticker".into(),
            "Open".into(),
            "High".into(),
            "Low".into(),
            "Close".into(),
            "Volume".into(),
        ]);
        for (ticker, vol) in [("BBCA.JK", 1000.0), ("TLKM.JK", 2000.0)] {
            t.push_row(vec![
                Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
                Cell::Text(ticker.into()),
                Cell::Number(100.0),
                Cell::Number(110.0),
                Cell::Number(95.0),
                Cell::Number(105.0),
                Cell::Number(vol),
            ]);
        }
        t
    }

    fn valid_report() -> ValidationReport {
        ValidationReport {
            status: ValidationStatus::Valid,
            notes: ValidationNotes::default(),
        }
    }

    #[tokio::test]
    async fn dataset_roundtrip() {
        let store = DatasetStore::in_memory().await.unwrap();
        let table = sample_table();
        let id = store
            .save_dataset(&table, "csv", "daily.csv", &Market::Id, &valid_report(), None)
            .await
            .unwrap();

        let record = store.get_dataset(&id).await.unwrap().unwrap();
        assert_eq!(record.row_count, 2);
        assert_eq!(record.ticker_count, 2);
        assert_eq!(record.asof_date, NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(record.validation_status, "valid");
        assert_eq!(record.table.columns, table.columns);
        assert_eq!(record.table.cell(1, 6).as_f64(), Some(2000.0));

        assert!(store.get_dataset("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn latest_dataset_respects_market_and_source() {
        let store = DatasetStore::in_memory().await.unwrap();
        let table = sample_table();
        store
            .save_dataset(&table, "csv", "a.csv", &Market::Id, &valid_report(), None)
            .await
            .unwrap();
        let newest = store
            .save_dataset(&table, "paste", "clip", &Market::Id, &valid_report(), None)
            .await
            .unwrap();

        let latest = store.latest_dataset(&Market::Id, None).await.unwrap().unwrap();
        assert_eq!(latest.id, newest);

        let latest_csv = store
            .latest_dataset(&Market::Id, Some("csv"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest_csv.source_type, "csv");

        assert!(store.latest_dataset(&Market::Us, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn datasets_by_date_lists_summaries() {
        let store = DatasetStore::in_memory().await.unwrap();
        store
            .save_dataset(&sample_table(), "csv", "a.csv", &Market::Id, &valid_report(), None)
            .await
            .unwrap();
        let asof = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let list = store.datasets_by_date(&Market::Id, asof).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].row_count, 2);
    }

    #[tokio::test]
    async fn schedules_become_due_and_roll_forward() {
        let store = DatasetStore::in_memory().await.unwrap();
        let now = Utc::now();
        let id = store
            .create_schedule(
                &Market::Id,
                "09:00",
                7 * 60,
                50,
                0.5,
                true,
                &["webhook".to_string()],
                now - Duration::minutes(5),
            )
            .await
            .unwrap();

        let due = store.due_schedules(now).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, id);
        assert_eq!(due[0].k, 50);
        assert!(due[0].exclude_watchlist);

        store
            .mark_schedule_run(&id, now + Duration::hours(24))
            .await
            .unwrap();
        assert!(store.due_schedules(now).await.unwrap().is_empty());
    }
}
