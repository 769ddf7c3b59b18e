//! In-memory backend for reference datasets.
//!
//! Datasets live in a shared DashMap keyed by sanitized name. Clones share
//! the same map, so a manager rebuilt from a clone sees earlier saves. Data
//! is lost when the process terminates.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use super::{DatasetStorage, StorageError, sanitize_name};
use crate::dataset::types::ReferenceDataset;

#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    storage: Arc<DashMap<String, ReferenceDataset>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored datasets
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

#[async_trait]
impl DatasetStorage for InMemoryStorage {
    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut keys: Vec<String> = self.storage.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        Ok(keys)
    }

    async fn load(&self, key: &str) -> Result<ReferenceDataset, StorageError> {
        self.storage
            .get(&sanitize_name(key))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::FileNotFound(key.to_string()))
    }

    async fn save(&self, dataset: &ReferenceDataset) -> Result<(), StorageError> {
        self.storage
            .insert(sanitize_name(&dataset.name), dataset.clone());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        self.storage.remove(&sanitize_name(name));
        Ok(())
    }
}
