use dashmap::DashMap;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::storage::{
    DatasetStorage, LocalFileSystemConfig, LocalFileSystemStorage, StorageError, sanitize_name,
};
use super::types::{ReferenceContent, ReferenceDataset, ReferenceItem, ReferenceItemType};
use crate::quality::ReferenceData;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Dataset already exists: {0}")]
    AlreadyExists(String),

    #[error("Dataset not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type DatasetResult<T> = std::result::Result<T, DatasetError>;

/// Owns every reference dataset and keeps the backing storage in sync.
///
/// All datasets are loaded eagerly when the manager is built. Each mutating
/// call rewrites the affected dataset in full before returning. Lookups of
/// unknown datasets return empty values rather than errors.
pub struct ReferenceDatasetManager {
    datasets: DashMap<String, ReferenceDataset>,
    storage: Box<dyn DatasetStorage>,
}

impl ReferenceDatasetManager {
    /// Builds a manager and loads every dataset the storage holds.
    ///
    /// Datasets that fail to load are logged and skipped.
    pub async fn new(storage: Box<dyn DatasetStorage>) -> Self {
        let manager = Self {
            datasets: DashMap::new(),
            storage,
        };
        manager.load_all().await;
        manager
    }

    /// Manager over one JSON file per dataset in `dir`.
    pub async fn from_dir(dir: impl Into<String>) -> Self {
        let storage = LocalFileSystemStorage::new(LocalFileSystemConfig::new(dir));
        Self::new(Box::new(storage)).await
    }

    async fn load_all(&self) {
        let keys = match self.storage.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                error!("Failed to list reference datasets: {}", e);
                return;
            }
        };
        for key in keys {
            match self.storage.load(&key).await {
                Ok(dataset) => {
                    debug!(dataset = %dataset.name, items = dataset.len(), "loaded reference dataset");
                    self.datasets.insert(dataset.name.clone(), dataset);
                }
                Err(e) => warn!("Skipping reference dataset {}: {}", key, e),
            }
        }
        info!("Loaded {} reference datasets", self.datasets.len());
    }

    /// Creates and immediately persists an empty dataset.
    ///
    /// Names that share a storage key with an existing dataset (for example
    /// `fleet/b737` and `fleet_b737`) are rejected as duplicates.
    pub async fn create_dataset(
        &self,
        name: &str,
        description: &str,
    ) -> DatasetResult<ReferenceDataset> {
        let key = sanitize_name(name);
        if let Some(existing) = self
            .datasets
            .iter()
            .find(|entry| sanitize_name(entry.key()) == key)
        {
            debug!("{} collides with existing dataset {}", name, existing.key());
            return Err(DatasetError::AlreadyExists(name.to_string()));
        }
        let dataset = ReferenceDataset::new(name, description);
        self.storage.save(&dataset).await?;
        self.datasets.insert(name.to_string(), dataset.clone());
        info!("Created reference dataset {}", name);
        Ok(dataset)
    }

    pub fn get_dataset(&self, name: &str) -> Option<ReferenceDataset> {
        self.datasets.get(name).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.datasets.contains_key(name)
    }

    /// Dataset names in sorted order.
    pub fn list_datasets(&self) -> Vec<String> {
        let mut names: Vec<String> = self.datasets.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Drops the dataset from memory and storage. Returns `false` for unknown names.
    pub async fn remove_dataset(&self, name: &str) -> DatasetResult<bool> {
        if self.datasets.remove(name).is_none() {
            return Ok(false);
        }
        self.storage.delete(name).await?;
        info!("Removed reference dataset {}", name);
        Ok(true)
    }

    /// Rewrites the dataset's document. Returns `false` for unknown names.
    pub async fn save_dataset(&self, name: &str) -> DatasetResult<bool> {
        let Some(dataset) = self.get_dataset(name) else {
            return Ok(false);
        };
        self.storage.save(&dataset).await?;
        debug!("Saved reference dataset {}", name);
        Ok(true)
    }

    /// Adds `item` and re-saves the dataset. `Ok(None)` when the dataset is unknown.
    ///
    /// The in-memory dataset only changes once the save has succeeded.
    pub async fn add_item(&self, dataset: &str, item: ReferenceItem) -> DatasetResult<Option<String>> {
        let Some(mut snapshot) = self.get_dataset(dataset) else {
            debug!("Ignoring item for unknown dataset {}", dataset);
            return Ok(None);
        };
        let id = snapshot.add_item(item.clone());
        self.storage.save(&snapshot).await?;

        if let Some(mut entry) = self.datasets.get_mut(dataset) {
            entry.add_item(item);
            entry.updated_at = snapshot.updated_at;
        }
        Ok(Some(id))
    }

    pub async fn add_fact(
        &self,
        dataset: &str,
        key: &str,
        value: impl Into<Value>,
        tags: &[String],
    ) -> DatasetResult<Option<String>> {
        self.add_item(dataset, ReferenceItem::fact(key, value, tags))
            .await
    }

    pub async fn add_required_element(
        &self,
        dataset: &str,
        element: &str,
        tags: &[String],
    ) -> DatasetResult<Option<String>> {
        self.add_item(dataset, ReferenceItem::required_element(element, tags))
            .await
    }

    pub async fn add_unsafe_pattern(
        &self,
        dataset: &str,
        pattern: &str,
        tags: &[String],
    ) -> DatasetResult<Option<String>> {
        self.add_item(dataset, ReferenceItem::unsafe_pattern(pattern, tags))
            .await
    }

    pub async fn add_query_response(
        &self,
        dataset: &str,
        query: &str,
        response: &str,
        tags: &[String],
    ) -> DatasetResult<Option<String>> {
        self.add_item(dataset, ReferenceItem::query_response(query, response, tags))
            .await
    }

    /// Buckets a dataset's items into [`ReferenceData`].
    ///
    /// With `tags`, only items sharing at least one of them are used. The first
    /// matching query/response item becomes the reference pair; later ones are
    /// ignored. Unknown datasets produce empty reference data.
    pub fn get_reference_data(&self, dataset: &str, tags: Option<&[String]>) -> ReferenceData {
        let mut data = ReferenceData::default();
        let Some(entry) = self.datasets.get(dataset) else {
            return data;
        };
        let filter = tags.unwrap_or_default();

        for item in entry.items.values().filter(|i| i.matches_any_tag(filter)) {
            match (item.item_type, &item.content) {
                (ReferenceItemType::Fact, ReferenceContent::Fact { key, value }) => {
                    data.facts.insert(key.clone(), value.clone());
                }
                (ReferenceItemType::RequiredElement, ReferenceContent::Text(text)) => {
                    data.required_elements.push(text.clone());
                }
                (ReferenceItemType::UnsafePattern, ReferenceContent::Text(text)) => {
                    data.unsafe_patterns.push(text.clone());
                }
                (ReferenceItemType::QueryResponse, ReferenceContent::QueryResponse { query, response }) => {
                    if data.reference_query.is_none() {
                        data.reference_query = Some(query.clone());
                        data.reference_response = Some(response.clone());
                    }
                }
                (item_type, _) => {
                    warn!(id = %item.id, %item_type, "reference item content does not match its type");
                }
            }
        }
        data
    }
}
