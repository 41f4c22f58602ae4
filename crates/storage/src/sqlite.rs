//! SQLite-backed metadata store

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::{seed_records, split_steps, DiseaseMetadata, DiseaseMetadataSource, StorageError};

type DiseaseRow = (
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

/// Metadata read from a `diseases` table
#[derive(Clone)]
pub struct SqliteDiseaseStore {
    pool: SqlitePool,
}

impl SqliteDiseaseStore {
    /// Connect to `url` (e.g. `sqlite://leafscan.db?mode=rwc` or `sqlite::memory:`)
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let pool = pool_options(url).connect(url).await?;
        info!("Connected disease store at {}", url);
        Ok(Self { pool })
    }

    /// Create the `diseases` table if missing
    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS diseases (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                name_hi TEXT,
                symptoms TEXT,
                treatment TEXT,
                severity TEXT DEFAULT 'MEDIUM'
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert the seed records when the table is empty. Returns how many were inserted.
    pub async fn seed_if_empty(&self) -> Result<usize, StorageError> {
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM diseases")
            .fetch_one(&self.pool)
            .await?;
        if existing > 0 {
            info!("Disease table already seeded, skipping");
            return Ok(0);
        }

        let records = seed_records();
        for record in &records {
            self.insert(record).await?;
        }
        info!("Disease table seeded with {} records", records.len());
        Ok(records.len())
    }

    /// Insert one record
    pub async fn insert(&self, record: &DiseaseMetadata) -> Result<(), StorageError> {
        let treatment = record.treatment_steps.join("\n");
        sqlx::query(
            "INSERT INTO diseases (name, name_hi, symptoms, treatment, severity) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&record.name)
        .bind(&record.localized_name)
        .bind(&record.symptoms)
        .bind(treatment)
        .bind(&record.severity)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Close the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// An in-memory database lives exactly as long as its connection, so those
/// pools pin one connection that is never reaped or recycled.
fn pool_options(url: &str) -> SqlitePoolOptions {
    if url.contains(":memory:") {
        SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(4)
    }
}

#[async_trait]
impl DiseaseMetadataSource for SqliteDiseaseStore {
    async fn lookup(&self, name: &str) -> Result<Option<DiseaseMetadata>, StorageError> {
        let row: Option<DiseaseRow> = sqlx::query_as(
            "SELECT name, name_hi, symptoms, treatment, severity FROM diseases WHERE name = ? LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        debug!("Disease lookup {:?}: {}", name, if row.is_some() { "hit" } else { "miss" });

        Ok(row.map(|(name, localized_name, symptoms, treatment, severity)| DiseaseMetadata {
            name,
            localized_name,
            symptoms,
            severity,
            treatment_steps: treatment.as_deref().map(split_steps).unwrap_or_default(),
        }))
    }
}
