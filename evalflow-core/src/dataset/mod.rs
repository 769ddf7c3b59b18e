//! Reference datasets: named collections of ground truth used to score responses.
//!
//! A [`ReferenceDatasetManager`] keeps every dataset in memory and writes each
//! change through a [`storage::DatasetStorage`] backend.

pub mod manager;
pub mod storage;
pub mod types;

pub use manager::{DatasetError, DatasetResult, ReferenceDatasetManager};
pub use types::{ReferenceContent, ReferenceDataset, ReferenceItem, ReferenceItemType};
