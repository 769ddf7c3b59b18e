use std::collections::HashMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::IntoEnumIterator;

pub const DEFAULT_MAX_SCORE: f64 = 10.0;

/// One named axis of response quality.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum QualityDimension {
    Relevance,
    Accuracy,
    Completeness,
    Helpfulness,
    Clarity,
    Conciseness,
    Coherence,
    Correctness,
    Safety,
}

impl QualityDimension {
    /// Every dimension in declaration order.
    pub fn all() -> Vec<Self> {
        Self::iter().collect()
    }

    /// Whether scoring this dimension needs reference data the caller may not have.
    pub fn requires_reference(&self) -> bool {
        matches!(self, Self::Accuracy | Self::Completeness | Self::Correctness)
    }
}

/// Score for a single dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub dimension: QualityDimension,
    pub score: f64,
    pub max_score: f64,
    pub normalized_score: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl QualityScore {
    /// Builds a score, clamping it into `[0, max_score]`.
    pub fn new(dimension: QualityDimension, score: f64, max_score: f64) -> Self {
        let max_score = if max_score.is_finite() && max_score > 0.0 {
            max_score
        } else {
            0.0
        };
        let score = if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, max_score)
        };
        let normalized_score = if max_score > 0.0 {
            score / max_score
        } else {
            0.0
        };
        Self {
            dimension,
            score,
            max_score,
            normalized_score,
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Result of scoring one query/response pair over a set of dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityEvaluation {
    pub query: String,
    pub response: String,
    pub scores: Vec<QualityScore>,
    pub overall_score: Option<f64>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl QualityEvaluation {
    /// An evaluation with no scores. Its overall score is `None`.
    pub fn empty(query: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            response: response.into(),
            scores: Vec::new(),
            overall_score: None,
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn score_for(&self, dimension: QualityDimension) -> Option<&QualityScore> {
        self.scores.iter().find(|s| s.dimension == dimension)
    }

    pub fn normalized_score_for(&self, dimension: QualityDimension) -> Option<f64> {
        self.score_for(dimension).map(|s| s.normalized_score)
    }

    pub fn dimensions(&self) -> Vec<QualityDimension> {
        self.scores.iter().map(|s| s.dimension).collect()
    }
}

/// Ground truth used by the reference-dependent metrics.
///
/// Produced by the dataset manager's `get_reference_data`, or built by hand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    #[serde(default)]
    pub facts: IndexMap<String, Value>,
    #[serde(default)]
    pub required_elements: Vec<String>,
    #[serde(default)]
    pub unsafe_patterns: Vec<String>,
    #[serde(default)]
    pub reference_query: Option<String>,
    #[serde(default)]
    pub reference_response: Option<String>,
    /// Overrides the default helpfulness indicator phrases
    #[serde(default)]
    pub helpfulness_indicators: Option<Vec<String>>,
}

impl ReferenceData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fact(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.facts.insert(key.into(), value.into());
        self
    }

    pub fn with_required_elements<I, S>(mut self, elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_elements
            .extend(elements.into_iter().map(Into::into));
        self
    }

    pub fn with_unsafe_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unsafe_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn with_reference_response(mut self, response: impl Into<String>) -> Self {
        self.reference_response = Some(response.into());
        self
    }

    pub fn with_helpfulness_indicators<I, S>(mut self, indicators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.helpfulness_indicators = Some(indicators.into_iter().map(Into::into).collect());
        self
    }

    /// Returns true when no item of any kind is present.
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
            && self.required_elements.is_empty()
            && self.unsafe_patterns.is_empty()
            && self.reference_query.is_none()
            && self.reference_response.is_none()
    }

    /// Whether the input a reference-dependent dimension needs is present and non-empty.
    pub fn supports(&self, dimension: QualityDimension) -> bool {
        match dimension {
            QualityDimension::Accuracy => !self.facts.is_empty(),
            QualityDimension::Completeness => !self.required_elements.is_empty(),
            QualityDimension::Correctness => self
                .reference_response
                .as_deref()
                .is_some_and(|r| !r.trim().is_empty()),
            _ => true,
        }
    }
}
