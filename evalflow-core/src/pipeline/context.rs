use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use super::result::EvaluationResult;
use crate::config::EvaluationConfig;
use crate::dataset::ReferenceDatasetManager;
use crate::feedback::{FeedbackSimulator, FeedbackType, UserFeedback};
use crate::quality::{QualityDimension, QualityEvaluation, QualityEvaluator, ReferenceData};

/// Collaborators shared by every stage of a pipeline.
pub struct PipelineServices {
    pub dataset_manager: Arc<ReferenceDatasetManager>,
    pub evaluator: Arc<QualityEvaluator>,
    pub feedback_simulator: Arc<FeedbackSimulator>,
    pub config: EvaluationConfig,
}

/// Per-call knobs shared by single and batch evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationOptions {
    pub reference_dataset: Option<String>,
    /// Only dataset items carrying at least one of these tags are used
    pub reference_tags: Option<Vec<String>>,
    pub dimensions: Option<Vec<QualityDimension>>,
    pub weights: Option<HashMap<QualityDimension, f64>>,
    pub feedback_types: Option<Vec<FeedbackType>>,
    pub metadata: HashMap<String, Value>,
}

impl EvaluationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(mut self, name: impl Into<String>) -> Self {
        self.reference_dataset = Some(name.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reference_tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_dimensions(mut self, dimensions: Vec<QualityDimension>) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn with_weights(mut self, weights: HashMap<QualityDimension, f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn with_feedback_types(mut self, types: Vec<FeedbackType>) -> Self {
        self.feedback_types = Some(types);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Input to a single pipeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationRequest {
    pub query: String,
    pub response: String,
    pub options: EvaluationOptions,
}

impl EvaluationRequest {
    pub fn new(query: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            response: response.into(),
            options: EvaluationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EvaluationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_dataset(mut self, name: impl Into<String>) -> Self {
        self.options = self.options.with_dataset(name);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = self.options.with_tags(tags);
        self
    }

    pub fn with_dimensions(mut self, dimensions: Vec<QualityDimension>) -> Self {
        self.options = self.options.with_dimensions(dimensions);
        self
    }

    pub fn with_weights(mut self, weights: HashMap<QualityDimension, f64>) -> Self {
        self.options = self.options.with_weights(weights);
        self
    }

    pub fn with_feedback_types(mut self, types: Vec<FeedbackType>) -> Self {
        self.options = self.options.with_feedback_types(types);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options = self.options.with_metadata(key, value);
        self
    }
}

/// Mutable record passed through every hook and handler of one run.
///
/// Stages communicate only through these fields. Whatever is left in
/// `evaluation`, `feedback` and `metadata` after the last stage becomes the
/// [`EvaluationResult`], unless a handler stored its own `result`.
pub struct EvaluationContext {
    pub query: String,
    pub response: String,
    pub options: EvaluationOptions,
    pub reference_data: Option<ReferenceData>,
    pub evaluation: Option<QualityEvaluation>,
    pub feedback: Option<Vec<UserFeedback>>,
    pub metadata: HashMap<String, Value>,
    pub result: Option<EvaluationResult>,
    services: Arc<PipelineServices>,
}

impl EvaluationContext {
    pub fn new(request: EvaluationRequest, services: Arc<PipelineServices>) -> Self {
        let metadata = request.options.metadata.clone();
        Self {
            query: request.query,
            response: request.response,
            options: request.options,
            reference_data: None,
            evaluation: None,
            feedback: None,
            metadata,
            result: None,
            services,
        }
    }

    pub fn services(&self) -> &PipelineServices {
        &self.services
    }

    /// Reference data from the requested dataset, filtered by the requested tags.
    ///
    /// `None` when no dataset was requested. An unknown dataset yields empty data.
    pub fn resolve_reference_data(&self) -> Option<ReferenceData> {
        let name = self.options.reference_dataset.as_deref()?;
        let manager = &self.services.dataset_manager;
        if !manager.contains(name) {
            warn!("Reference dataset {} not found, scoring without it", name);
        }
        Some(manager.get_reference_data(name, self.options.reference_tags.as_deref()))
    }

    /// Scores the pair with the shared evaluator and stores the evaluation.
    ///
    /// Reference data already placed on the context is used as is.
    pub async fn compute_evaluation(&mut self) {
        if self.reference_data.is_none() {
            self.reference_data = self.resolve_reference_data();
        }
        let evaluation = self
            .services
            .evaluator
            .evaluate(
                &self.query,
                &self.response,
                self.reference_data.as_ref(),
                self.options.dimensions.as_deref(),
                self.options.weights.as_ref(),
            )
            .await;
        debug!(overall = ?evaluation.overall_score, scores = evaluation.scores.len(), "computed evaluation");
        self.evaluation = Some(evaluation);
    }

    /// Simulates feedback against the current evaluation and stores it.
    pub async fn compute_feedback(&mut self) {
        let feedback = self
            .services
            .feedback_simulator
            .simulate_feedback(
                &self.query,
                &self.response,
                self.evaluation.as_ref(),
                self.options.feedback_types.as_deref(),
                None,
            )
            .await;
        self.feedback = Some(feedback);
    }

    /// Final result of the run.
    ///
    /// A missing evaluation becomes an empty one and missing feedback an empty list.
    pub fn into_result(self) -> EvaluationResult {
        if let Some(result) = self.result {
            return result;
        }
        let evaluation = self
            .evaluation
            .unwrap_or_else(|| QualityEvaluation::empty(self.query.clone(), self.response.clone()));
        EvaluationResult {
            query: self.query,
            response: self.response,
            evaluation,
            feedback: self.feedback.unwrap_or_default(),
            metadata: self.metadata,
            timestamp: Utc::now(),
        }
    }
}
