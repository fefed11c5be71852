use std::path::Path;

use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::types::Source;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Append-only record of every `(source, id)` that has been announced.
#[derive(Debug, Clone)]
pub struct SeenStore {
    pool: SqlitePool,
}

impl SeenStore {
    pub async fn open(database_path: &str) -> Result<Self, StoreError> {
        if let Some(parent) = Path::new(database_path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let connection_string = if database_path.starts_with("sqlite:") {
            database_path.to_string()
        } else {
            format!("sqlite://{}?mode=rwc", database_path)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&connection_string)
            .await?;

        let store = Self { pool };
        store.initialize_schema().await?;
        log::info!("Opened listing store at {}", database_path);

        Ok(store)
    }

    /// Private in-memory database. Lives as long as the store does.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.initialize_schema().await?;
        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS seen_listings (
                source TEXT NOT NULL,
                listing_id TEXT NOT NULL,
                first_seen DATETIME NOT NULL,
                PRIMARY KEY (source, listing_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn has_seen(&self, source: Source, id: &str) -> Result<bool, StoreError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM seen_listings WHERE source = ? AND listing_id = ?")
                .bind(source.slug())
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.is_some())
    }

    /// Idempotent; the first `first_seen` timestamp is kept.
    pub async fn mark_seen(&self, source: Source, id: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO seen_listings (source, listing_id, first_seen)
            VALUES (?, ?, ?)
            ON CONFLICT(source, listing_id) DO NOTHING
            "#,
        )
        .bind(source.slug())
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM seen_listings")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
