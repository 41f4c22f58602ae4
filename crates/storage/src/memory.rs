//! In-memory metadata store

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::{seed_records, DiseaseMetadata, DiseaseMetadataSource, StorageError};

/// Metadata held in a process-local map
pub struct MemoryDiseaseStore {
    records: RwLock<HashMap<String, DiseaseMetadata>>,
}

impl MemoryDiseaseStore {
    /// Empty store
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Store holding the shipped seed records
    pub fn seeded() -> Self {
        let store = Self::new();
        let records = seed_records();
        info!("Creating in-memory disease store with {} records", records.len());
        if let Ok(mut map) = store.records.write() {
            map.extend(records.into_iter().map(|r| (r.name.clone(), r)));
        }
        store
    }

    /// Insert or replace a record
    pub fn upsert(&self, record: DiseaseMetadata) -> Result<(), StorageError> {
        let mut map = self
            .records
            .write()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        debug!("Upserting disease metadata for {:?}", record.name);
        map.insert(record.name.clone(), record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryDiseaseStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DiseaseMetadataSource for MemoryDiseaseStore {
    async fn lookup(&self, name: &str) -> Result<Option<DiseaseMetadata>, StorageError> {
        let map = self
            .records
            .read()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        Ok(map.get(name).cloned())
    }
}
