//! Local file system backend for reference datasets.
//!
//! Each dataset is stored in a single JSON file named after the sanitized
//! dataset name inside the configured base directory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use super::{DatasetStorage, StorageError, sanitize_name};
use crate::dataset::types::ReferenceDataset;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalFileSystemConfig {
    pub base_dir: String,
    #[serde(default = "default_file_extension")]
    pub file_extension: String,
}

impl LocalFileSystemConfig {
    pub fn new(base_dir: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            file_extension: default_file_extension(),
        }
    }
}

fn default_file_extension() -> String {
    "json".to_string()
}

/// Dataset storage backed by one JSON file per dataset
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so readers never observe a half-written document.
#[derive(Debug, Clone)]
pub struct LocalFileSystemStorage {
    config: LocalFileSystemConfig,
}

impl LocalFileSystemStorage {
    pub fn new(config: LocalFileSystemConfig) -> Self {
        Self { config }
    }

    pub fn base_dir(&self) -> &Path {
        Path::new(&self.config.base_dir)
    }

    /// Get the file path for a dataset name or storage key
    fn get_file_path(&self, name: &str) -> PathBuf {
        let mut path = PathBuf::from(&self.config.base_dir);
        path.push(format!(
            "{}.{}",
            sanitize_name(name),
            self.config.file_extension
        ));
        path
    }

    async fn ensure_base_dir_exists(&self) -> Result<(), StorageError> {
        let path = self.base_dir();
        if !path.exists() {
            fs::create_dir_all(path).await.map_err(|e| {
                StorageError::InvalidPath(format!("Failed to create directory: {}", e))
            })?;
        }
        Ok(())
    }

    async fn write_atomically(&self, path: &Path, data: &[u8]) -> Result<(), StorageError> {
        let dir = path.parent().ok_or_else(|| {
            StorageError::InvalidPath("Invalid path: no parent directory".to_string())
        })?;

        fs::create_dir_all(dir)
            .await
            .map_err(|e| StorageError::InvalidPath(format!("Failed to create directory: {}", e)))?;

        let temp_file = NamedTempFile::new_in(dir).map_err(|e| {
            StorageError::StorageError(format!("Failed to create temporary file: {}", e))
        })?;
        let temp_path = temp_file.into_temp_path();

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| StorageError::StorageError(format!("Failed to create file: {}", e)))?;

        file.write_all(data)
            .await
            .map_err(|e| StorageError::StorageError(format!("Failed to write to file: {}", e)))?;

        file.flush()
            .await
            .map_err(|e| StorageError::StorageError(format!("Failed to flush file: {}", e)))?;
        drop(file);

        temp_path
            .persist(path)
            .map_err(|e| StorageError::StorageError(format!("Failed to rename file: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl DatasetStorage for LocalFileSystemStorage {
    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.ensure_base_dir_exists().await?;

        let pattern = format!(
            "{}/*.{}",
            glob::Pattern::escape(&self.config.base_dir),
            self.config.file_extension
        );
        let entries = glob::glob(&pattern)
            .map_err(|e| StorageError::InvalidPath(format!("Invalid glob pattern: {}", e)))?;

        let mut keys: Vec<String> = entries
            .filter_map(|entry| match entry {
                Ok(path) => path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().to_string()),
                Err(e) => {
                    debug!("Unreadable dataset directory entry: {}", e);
                    None
                }
            })
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn load(&self, key: &str) -> Result<ReferenceDataset, StorageError> {
        let path = self.get_file_path(key);
        if !path.exists() {
            return Err(StorageError::FileNotFound(path.display().to_string()));
        }

        let mut file = fs::File::open(&path)
            .await
            .map_err(|e| StorageError::FileNotFound(format!("Failed to open file: {}", e)))?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)
            .await
            .map_err(|e| StorageError::StorageError(format!("Failed to read file: {}", e)))?;

        serde_json::from_slice(&contents).map_err(|e| {
            StorageError::DeserializationError(format!(
                "Failed to parse {}: {}",
                path.display(),
                e
            ))
        })
    }

    async fn save(&self, dataset: &ReferenceDataset) -> Result<(), StorageError> {
        self.ensure_base_dir_exists().await?;
        let path = self.get_file_path(&dataset.name);

        let json = serde_json::to_vec_pretty(dataset).map_err(|e| {
            StorageError::SerializationError(format!("Failed to serialize dataset: {}", e))
        })?;

        self.write_atomically(&path, &json).await
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let path = self.get_file_path(name);
        if !path.exists() {
            return Ok(());
        }
        fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::StorageError(format!("Failed to remove file: {}", e)))
    }

    async fn is_available(&self) -> bool {
        if let Ok(()) = self.ensure_base_dir_exists().await {
            let test_path = self.base_dir().join("test_availability.tmp");
            if self.write_atomically(&test_path, b"test").await.is_ok() {
                let _ = fs::remove_file(&test_path).await;
                return true;
            }
        }
        false
    }
}
