//! Storage capability for reference datasets.
//!
//! The [`DatasetStorage`] trait abstracts where dataset documents live. Each
//! dataset is stored as one whole document keyed by its name, and every save
//! replaces the previous document entirely.
//!
//! # Usage Example
//!
//! ```no_run
//! use evalflow_core::dataset::ReferenceDataset;
//! use evalflow_core::dataset::storage::{DatasetStorage, LocalFileSystemConfig, LocalFileSystemStorage};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = LocalFileSystemStorage::new(LocalFileSystemConfig::new("/tmp/datasets"));
//! storage.save(&ReferenceDataset::new("b737", "Boeing 737 maintenance facts")).await?;
//! for key in storage.keys().await? {
//!     let dataset = storage.load(&key).await?;
//!     println!("{} has {} items", dataset.name, dataset.len());
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use super::types::ReferenceDataset;

pub mod in_memory;
pub mod local_fs;

pub use in_memory::InMemoryStorage;
pub use local_fs::{LocalFileSystemConfig, LocalFileSystemStorage};

/// Errors raised by dataset storage backends
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Dataset file not found: {0}")]
    FileNotFound(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

/// Persistence backend for reference datasets.
///
/// # Thread Safety
///
/// Implementations must be usable from multiple tasks. Writers are not
/// coordinated: two concurrent saves of the same dataset race and the last
/// one wins.
#[async_trait]
pub trait DatasetStorage: Send + Sync {
    /// Storage keys of every stored dataset.
    async fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// Loads the dataset stored under `key`.
    async fn load(&self, key: &str) -> Result<ReferenceDataset, StorageError>;

    /// Writes the whole dataset, replacing any previous document.
    async fn save(&self, dataset: &ReferenceDataset) -> Result<(), StorageError>;

    /// Removes the dataset named `name`. Missing datasets are not an error.
    async fn delete(&self, name: &str) -> Result<(), StorageError>;

    /// Check if the backend can currently be written to
    async fn is_available(&self) -> bool {
        true
    }
}

/// Replaces characters that are problematic in file names or storage keys.
pub fn sanitize_name(name: &str) -> String {
    name.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_")
}
