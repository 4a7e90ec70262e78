//! Append-only SQLite history of observed prices.

use std::str::FromStr;

use chrono::DateTime;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Row,
};
use thiserror::Error;

use crate::models::PriceSample;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("corrupt timestamp in row {0}")]
    Timestamp(i64),
}

#[derive(Clone)]
pub struct PriceStore {
    pool: SqlitePool,
}

impl PriceStore {
    /// Open (or create) the database file at `path`.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);
        Self::connect_with(options, 2).await
    }

    /// Private in-memory database; one connection so every query sees it.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        Self::connect_with(options, 1).await
    }

    async fn connect_with(options: SqliteConnectOptions, max: u32) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS price_samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                asset TEXT NOT NULL,
                price REAL NOT NULL,
                observed_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_price_samples_asset_time ON price_samples (asset, observed_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Append a sample, returning its row id.
    pub async fn record(&self, sample: &PriceSample) -> Result<i64, StoreError> {
        let res = sqlx::query("INSERT INTO price_samples (asset, price, observed_at) VALUES (?, ?, ?)")
            .bind(&sample.asset)
            .bind(sample.price)
            .bind(sample.observed_at.timestamp_millis())
            .execute(&self.pool)
            .await?;

        Ok(res.last_insert_rowid())
    }

    /// Most recent `limit` samples for `asset`, newest first.
    pub async fn recent(&self, asset: &str, limit: i64) -> Result<Vec<PriceSample>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, asset, price, observed_at
            FROM price_samples
            WHERE asset = ?
            ORDER BY observed_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(asset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<PriceSample, StoreError> {
                let id: i64 = row.try_get("id")?;
                let ms: i64 = row.try_get("observed_at")?;
                Ok(PriceSample {
                    asset: row.try_get("asset")?,
                    price: row.try_get("price")?,
                    observed_at: DateTime::from_timestamp_millis(ms)
                        .ok_or(StoreError::Timestamp(id))?,
                })
            })
            .collect()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
