use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};
use thiserror::Error;

use crate::quality::QualityDimension;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top level settings shared by the dataset manager, evaluator, feedback
/// simulator and pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationConfig {
    /// Name written into saved result files
    #[serde(default = "default_name")]
    pub name: String,

    /// Directory holding one JSON file per reference dataset
    #[serde(default = "default_datasets_dir")]
    pub datasets_dir: String,

    /// Directory receiving saved evaluation results
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    #[serde(default = "default_max_score")]
    pub max_score: f64,

    #[serde(default)]
    pub feedback: FeedbackConfig,

    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,

    #[serde(default = "default_dimensions")]
    pub default_dimensions: Vec<QualityDimension>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            datasets_dir: default_datasets_dir(),
            output_dir: default_output_dir(),
            max_score: default_max_score(),
            feedback: FeedbackConfig::default(),
            batch_concurrency: default_batch_concurrency(),
            default_dimensions: default_dimensions(),
        }
    }
}

impl EvaluationConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.datasets_dir.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "datasets_dir must not be empty".to_string(),
            ));
        }
        if self.max_score.is_nan() || self.max_score <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "max_score must be positive, got {}",
                self.max_score
            )));
        }
        self.feedback.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackConfig {
    /// Chance that a simulate call produces any feedback at all
    #[serde(default = "default_feedback_probability")]
    pub probability: f64,

    #[serde(default = "default_rating_scale")]
    pub rating_scale: u32,

    /// Fixed seed for reproducible simulations; entropy-seeded when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            probability: default_feedback_probability(),
            rating_scale: default_rating_scale(),
            seed: None,
        }
    }
}

impl FeedbackConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if !(0.0..=1.0).contains(&self.probability) {
            return Err(ConfigError::Invalid(format!(
                "feedback probability must be within [0, 1], got {}",
                self.probability
            )));
        }
        if self.rating_scale == 0 {
            return Err(ConfigError::Invalid(
                "rating_scale must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> ConfigResult<T> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> ConfigResult<T> {
    let config = serde_json::from_str(s)?;
    Ok(config)
}

fn default_name() -> String {
    "evaluation".to_string()
}
fn default_datasets_dir() -> String {
    "data/reference_datasets".to_string()
}
fn default_output_dir() -> String {
    "data/evaluation_results".to_string()
}
fn default_max_score() -> f64 {
    10.0
}
fn default_batch_concurrency() -> usize {
    1
}
fn default_dimensions() -> Vec<QualityDimension> {
    QualityDimension::all()
}
fn default_feedback_probability() -> f64 {
    0.8
}
fn default_rating_scale() -> u32 {
    5
}
