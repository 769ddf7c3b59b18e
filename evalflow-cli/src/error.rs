use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] evalflow_core::Error),

    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<evalflow_core::config::ConfigError> for CliError {
    fn from(e: evalflow_core::config::ConfigError) -> Self {
        Self::Core(e.into())
    }
}

impl From<evalflow_core::dataset::DatasetError> for CliError {
    fn from(e: evalflow_core::dataset::DatasetError) -> Self {
        Self::Core(e.into())
    }
}

pub type CliResult<T> = Result<T, CliError>;
