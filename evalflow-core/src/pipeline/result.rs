use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::feedback::UserFeedback;
use crate::quality::QualityEvaluation;

/// Everything one pipeline run produced for a query/response pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub query: String,
    pub response: String,
    pub evaluation: QualityEvaluation,
    #[serde(default)]
    pub feedback: Vec<UserFeedback>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl EvaluationResult {
    pub fn overall_score(&self) -> Option<f64> {
        self.evaluation.overall_score
    }
}

/// Document written by `save_results`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsFile {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub results: Vec<EvaluationResult>,
}

impl ResultsFile {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = tokio::fs::read(path.as_ref()).await?;
        Ok(serde_json::from_slice(&contents)?)
    }
}
