use std::collections::{HashMap, HashSet};

use serde_json::json;
use tokio::sync::RwLock;
use tracing::debug;

use super::metrics::score_dimension;
use super::statistics::ScoreStatistics;
use super::types::{DEFAULT_MAX_SCORE, QualityDimension, QualityEvaluation, ReferenceData};

/// Aggregates per-dimension metrics into a weighted overall score and keeps
/// every evaluation it produces.
///
/// The overall score is normalized to `[0, 1]`:
/// `Σ(weight · score / max_score) / Σ weight` over the dimensions actually scored.
pub struct QualityEvaluator {
    max_score: f64,
    default_dimensions: Vec<QualityDimension>,
    history: RwLock<Vec<QualityEvaluation>>,
}

impl Default for QualityEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SCORE)
    }
}

impl QualityEvaluator {
    pub fn new(max_score: f64) -> Self {
        Self {
            max_score,
            default_dimensions: QualityDimension::all(),
            history: RwLock::new(Vec::new()),
        }
    }

    /// Replaces the dimensions scored when a caller does not name any.
    pub fn with_default_dimensions(mut self, dimensions: Vec<QualityDimension>) -> Self {
        self.default_dimensions = dimensions;
        self
    }

    pub fn max_score(&self) -> f64 {
        self.max_score
    }

    /// Scores the pair and records the evaluation in the history.
    pub async fn evaluate(
        &self,
        query: &str,
        response: &str,
        reference: Option<&ReferenceData>,
        dimensions: Option<&[QualityDimension]>,
        weights: Option<&HashMap<QualityDimension, f64>>,
    ) -> QualityEvaluation {
        let evaluation = self.score(query, response, reference, dimensions, weights);
        self.history.write().await.push(evaluation.clone());
        evaluation
    }

    /// Scores the pair without touching the history.
    ///
    /// Accuracy, completeness and correctness are skipped when `reference`
    /// lacks the facts, required elements or reference response they need.
    ///
    /// Negative weights count as zero. If every scored dimension ends up with
    /// weight zero the overall score is their unweighted mean, so it is `None`
    /// only when nothing was scored.
    pub fn score(
        &self,
        query: &str,
        response: &str,
        reference: Option<&ReferenceData>,
        dimensions: Option<&[QualityDimension]>,
        weights: Option<&HashMap<QualityDimension, f64>>,
    ) -> QualityEvaluation {
        let requested = dimensions.unwrap_or(self.default_dimensions.as_slice());
        let mut evaluation = QualityEvaluation::empty(query, response);
        let mut seen = HashSet::new();
        let mut skipped = Vec::new();

        for &dimension in requested {
            if !seen.insert(dimension) {
                continue;
            }
            if dimension.requires_reference()
                && !reference.is_some_and(|r| r.supports(dimension))
            {
                debug!(%dimension, "skipping dimension without reference input");
                skipped.push(dimension);
                continue;
            }
            evaluation.scores.push(score_dimension(
                dimension,
                query,
                response,
                reference,
                self.max_score,
            ));
        }

        evaluation.overall_score = overall_score(&evaluation, weights);
        if !skipped.is_empty() {
            evaluation
                .metadata
                .insert("skipped_dimensions".to_string(), json!(skipped));
        }
        evaluation
    }

    pub async fn history(&self) -> Vec<QualityEvaluation> {
        self.history.read().await.clone()
    }

    pub async fn clear_history(&self) {
        self.history.write().await.clear();
    }

    /// Evaluations matching the optional bounds.
    ///
    /// With a dimension, the bounds apply to that dimension's raw score and
    /// evaluations without it are dropped. Without one, they apply to the
    /// overall score.
    pub async fn filter_evaluations(
        &self,
        dimension: Option<QualityDimension>,
        min_score: Option<f64>,
        max_score: Option<f64>,
    ) -> Vec<QualityEvaluation> {
        let within = |value: f64| {
            min_score.is_none_or(|min| value >= min) && max_score.is_none_or(|max| value <= max)
        };
        self.history
            .read()
            .await
            .iter()
            .filter(|evaluation| match dimension {
                Some(dimension) => evaluation
                    .score_for(dimension)
                    .is_some_and(|s| within(s.score)),
                None if min_score.is_none() && max_score.is_none() => true,
                None => evaluation.overall_score.is_some_and(within),
            })
            .cloned()
            .collect()
    }

    /// Mean raw score per dimension across the history.
    pub async fn average_scores(&self) -> HashMap<QualityDimension, f64> {
        let history = self.history.read().await;
        let mut sums: HashMap<QualityDimension, (f64, usize)> = HashMap::new();
        for score in history.iter().flat_map(|e| e.scores.iter()) {
            let entry = sums.entry(score.dimension).or_insert((0.0, 0));
            entry.0 += score.score;
            entry.1 += 1;
        }
        sums.into_iter()
            .map(|(dimension, (sum, count))| (dimension, sum / count as f64))
            .collect()
    }

    /// Distribution of one dimension's raw scores, or of overall scores when
    /// `dimension` is `None`.
    pub async fn score_statistics(
        &self,
        dimension: Option<QualityDimension>,
    ) -> Option<ScoreStatistics> {
        let history = self.history.read().await;
        let samples: Vec<f64> = match dimension {
            Some(dimension) => history
                .iter()
                .filter_map(|e| e.score_for(dimension).map(|s| s.score))
                .collect(),
            None => history.iter().filter_map(|e| e.overall_score).collect(),
        };
        ScoreStatistics::from_samples(&samples)
    }
}

fn overall_score(
    evaluation: &QualityEvaluation,
    weights: Option<&HashMap<QualityDimension, f64>>,
) -> Option<f64> {
    if evaluation.scores.is_empty() {
        return None;
    }
    let (weighted, total_weight) =
        evaluation
            .scores
            .iter()
            .fold((0.0, 0.0), |(weighted, total), score| {
                let weight = weights
                    .and_then(|w| w.get(&score.dimension).copied())
                    .unwrap_or(1.0)
                    .max(0.0);
                (weighted + weight * score.normalized_score, total + weight)
            });
    if total_weight > 0.0 {
        Some(weighted / total_weight)
    } else {
        let sum: f64 = evaluation.scores.iter().map(|s| s.normalized_score).sum();
        Some(sum / evaluation.scores.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn reference() -> ReferenceData {
        ReferenceData::new()
            .with_fact("main", "200 psi")
            .with_required_elements(["tire pressure", "maintenance manual"])
            .with_reference_response("main gear 200 psi")
    }

    #[tokio::test]
    async fn test_reference_dimensions_skipped_without_reference() {
        let evaluator = QualityEvaluator::default();
        let evaluation = evaluator
            .evaluate("what pressure", "pressure is high", None, None, None)
            .await;

        let dimensions = evaluation.dimensions();
        assert_eq!(dimensions.len(), 6);
        assert!(!dimensions.contains(&QualityDimension::Accuracy));
        assert!(!dimensions.contains(&QualityDimension::Completeness));
        assert!(!dimensions.contains(&QualityDimension::Correctness));
        assert!(evaluation.overall_score.is_some());
        assert_eq!(
            evaluation.metadata["skipped_dimensions"],
            json!(["accuracy", "completeness", "correctness"])
        );
    }

    #[tokio::test]
    async fn test_overall_none_when_nothing_scored() {
        let evaluator = QualityEvaluator::default();
        let evaluation = evaluator
            .evaluate(
                "q",
                "r",
                None,
                Some([QualityDimension::Accuracy, QualityDimension::Correctness].as_slice()),
                None,
            )
            .await;
        assert!(evaluation.scores.is_empty());
        assert_eq!(evaluation.overall_score, None);
    }

    #[tokio::test]
    async fn test_duplicates_scored_once() {
        let evaluator = QualityEvaluator::default();
        let evaluation = evaluator
            .evaluate(
                "tire",
                "tire",
                None,
                Some([QualityDimension::Relevance, QualityDimension::Relevance].as_slice()),
                None,
            )
            .await;
        assert_eq!(evaluation.scores.len(), 1);
        assert_eq!(evaluation.overall_score, Some(1.0));
    }

    #[test]
    fn test_weighted_overall() {
        let evaluator = QualityEvaluator::default();
        let reference = reference();
        // relevance 1.0, accuracy 0.0
        let mut weights = HashMap::new();
        weights.insert(QualityDimension::Relevance, 3.0);
        let evaluation = evaluator.score(
            "tire",
            "tire",
            Some(&reference),
            Some([QualityDimension::Relevance, QualityDimension::Accuracy].as_slice()),
            Some(&weights),
        );
        let overall = evaluation.overall_score.unwrap();
        assert!((overall - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_zero_weights_fall_back_to_plain_mean() {
        let evaluator = QualityEvaluator::default();
        let reference = reference();
        let mut weights = HashMap::new();
        weights.insert(QualityDimension::Relevance, 0.0);
        weights.insert(QualityDimension::Accuracy, 0.0);
        let evaluation = evaluator.score(
            "tire",
            "tire",
            Some(&reference),
            Some([QualityDimension::Relevance, QualityDimension::Accuracy].as_slice()),
            Some(&weights),
        );
        assert_eq!(evaluation.scores.len(), 2);
        let overall = evaluation.overall_score.unwrap();
        assert!((overall - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_negative_weights_count_as_zero() {
        let evaluator = QualityEvaluator::default();
        let reference = reference();
        // relevance 1.0, accuracy 0.0
        let mut weights = HashMap::new();
        weights.insert(QualityDimension::Accuracy, -5.0);
        let evaluation = evaluator.score(
            "tire",
            "tire",
            Some(&reference),
            Some([QualityDimension::Relevance, QualityDimension::Accuracy].as_slice()),
            Some(&weights),
        );
        assert_eq!(evaluation.overall_score, Some(1.0));
    }

    #[tokio::test]
    async fn test_history_queries() {
        let evaluator = QualityEvaluator::default();
        let dims = [QualityDimension::Relevance];
        evaluator
            .evaluate("tire pressure", "tire pressure", None, Some(dims.as_slice()), None)
            .await;
        evaluator
            .evaluate("tire pressure", "tire", None, Some(dims.as_slice()), None)
            .await;
        evaluator
            .evaluate("tire pressure", "nothing", None, Some(dims.as_slice()), None)
            .await;

        assert_eq!(evaluator.history().await.len(), 3);

        let high = evaluator
            .filter_evaluations(Some(QualityDimension::Relevance), Some(5.0), None)
            .await;
        assert_eq!(high.len(), 2);

        let low_overall = evaluator.filter_evaluations(None, None, Some(0.4)).await;
        assert_eq!(low_overall.len(), 1);

        let averages = evaluator.average_scores().await;
        assert!((averages[&QualityDimension::Relevance] - 5.0).abs() < 1e-12);

        let stats = evaluator
            .score_statistics(Some(QualityDimension::Relevance))
            .await
            .unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.median, 5.0);
        assert_eq!(stats.max, 10.0);

        assert!(
            evaluator
                .score_statistics(Some(QualityDimension::Safety))
                .await
                .is_none()
        );

        evaluator.clear_history().await;
        assert!(evaluator.history().await.is_empty());
    }

    #[test]
    fn test_custom_default_dimensions() {
        let evaluator = QualityEvaluator::new(5.0)
            .with_default_dimensions(vec![QualityDimension::Safety, QualityDimension::Clarity]);
        let evaluation = evaluator.score("q", "A fine answer here.", None, None, None);
        assert_eq!(
            evaluation.dimensions(),
            vec![QualityDimension::Safety, QualityDimension::Clarity]
        );
        assert!(evaluation.scores.iter().all(|s| s.max_score == 5.0));
    }
}
