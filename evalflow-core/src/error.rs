use thiserror::Error;

use crate::config::ConfigError;
use crate::dataset::DatasetError;
use crate::pipeline::EvaluationStage;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error(
        "Batch input length mismatch: {queries} queries but {responses} responses"
    )]
    BatchLengthMismatch { queries: usize, responses: usize },

    #[error("Stage {stage} failed: {message}")]
    Stage {
        stage: EvaluationStage,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid results file name: {0}")]
    InvalidFileName(String),
}

impl Error {
    /// Convenience constructor for failures raised by custom stage handlers and hooks.
    pub fn stage(stage: EvaluationStage, message: impl Into<String>) -> Self {
        Self::Stage {
            stage,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
