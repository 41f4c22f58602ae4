//! Disease Metadata Storage
//!
//! Keyed lookup of per-disease enrichment (localized name, symptoms) by
//! canonical disease name. A miss is a normal outcome.

mod memory;
mod sqlite;

pub use memory::MemoryDiseaseStore;
pub use sqlite::SqliteDiseaseStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::DatabaseError(err.to_string())
    }
}

/// Enrichment record for one disease
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseaseMetadata {
    /// Canonical disease name (lookup key)
    pub name: String,
    /// Hindi display name
    pub localized_name: Option<String>,
    pub symptoms: Option<String>,
    /// Severity as stored, not validated
    pub severity: Option<String>,
    /// Treatment text split into steps
    pub treatment_steps: Vec<String>,
}

/// External keyed lookup of disease metadata
#[async_trait]
pub trait DiseaseMetadataSource: Send + Sync {
    /// Fetch metadata for an exact canonical name; `Ok(None)` on a miss
    async fn lookup(&self, name: &str) -> Result<Option<DiseaseMetadata>, StorageError>;
}

/// Records the service ships with
pub fn seed_records() -> Vec<DiseaseMetadata> {
    vec![
        DiseaseMetadata {
            name: "Apple scab".to_string(),
            localized_name: Some("सेब की पपड़ी (Apple Scab)".to_string()),
            symptoms: Some("Velvety, olive-green to black spots on leaves and fruit.".to_string()),
            severity: Some("MEDIUM".to_string()),
            treatment_steps: split_steps("Remove infected leaves.\nApply Mancozeb 75% WP @ 2g/liter."),
        },
        DiseaseMetadata {
            name: "Black rot".to_string(),
            localized_name: Some("काला सड़न (Black Rot)".to_string()),
            symptoms: Some("Brown, circular spots on leaves; rotting fruit.".to_string()),
            severity: Some("HIGH".to_string()),
            treatment_steps: split_steps("Prune dead wood.\nApply Captan or Thiram."),
        },
        DiseaseMetadata {
            name: "healthy".to_string(),
            localized_name: Some("स्वस्थ (Healthy)".to_string()),
            symptoms: Some("None. The plant looks vigorous.".to_string()),
            severity: Some("LOW".to_string()),
            treatment_steps: split_steps("Continue regular care and monitoring."),
        },
    ]
}

/// Newline-separated treatment text to ordered steps
pub(crate) fn split_steps(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
