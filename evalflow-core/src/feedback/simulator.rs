use std::collections::HashMap;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::templates::{CORRECTIONS, FOLLOW_UPS, comments_for};
use super::types::{FeedbackContent, FeedbackStatistics, FeedbackType, Sentiment, UserFeedback};
use crate::config::FeedbackConfig;
use crate::quality::{QualityDimension, QualityEvaluation};

const ALL_FEEDBACK_TYPES: [FeedbackType; 5] = [
    FeedbackType::Rating,
    FeedbackType::Thumbs,
    FeedbackType::Comment,
    FeedbackType::Correction,
    FeedbackType::FollowUp,
];

/// Rating weights for 1..=5, biased toward high ratings.
const RATING_WEIGHTS: [f64; 5] = [0.05, 0.1, 0.2, 0.3, 0.35];
const COMMENT_SENTIMENT_WEIGHTS: [(Sentiment, f64); 3] = [
    (Sentiment::Positive, 0.6),
    (Sentiment::Neutral, 0.3),
    (Sentiment::Negative, 0.1),
];

const THUMBS_UP_THRESHOLD: f64 = 0.7;
const POSITIVE_COMMENT_THRESHOLD: f64 = 0.8;
const NEUTRAL_COMMENT_THRESHOLD: f64 = 0.5;
const CORRECTION_THRESHOLD: f64 = 0.7;
const FOLLOW_UP_THRESHOLD: f64 = 0.8;

const RANDOM_THUMBS_UP_PROBABILITY: f64 = 0.7;
const RANDOM_CORRECTION_PROBABILITY: f64 = 0.2;
const RANDOM_FOLLOW_UP_PROBABILITY: f64 = 0.3;

/// Produces synthetic user feedback calibrated to an evaluation.
///
/// All thresholds compare against normalized scores in `[0, 1]`. Without an
/// evaluation, each feedback kind falls back to a biased random draw. Every
/// generated item is kept in the simulator's history.
pub struct FeedbackSimulator {
    probability: f64,
    rating_scale: u32,
    rng: Mutex<StdRng>,
    history: RwLock<Vec<UserFeedback>>,
}

impl Default for FeedbackSimulator {
    fn default() -> Self {
        Self::new(&FeedbackConfig::default())
    }
}

impl FeedbackSimulator {
    pub fn new(config: &FeedbackConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            probability: config.probability,
            rating_scale: config.rating_scale.max(1),
            rng: Mutex::new(rng),
            history: RwLock::new(Vec::new()),
        }
    }

    /// A simulator with default settings and a fixed seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::new(&FeedbackConfig {
            seed: Some(seed),
            ..FeedbackConfig::default()
        })
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn rating_scale(&self) -> u32 {
        self.rating_scale
    }

    /// Simulates feedback for one response.
    ///
    /// A single draw at `probability` (the configured default when `None`)
    /// decides whether any feedback is given. When it is, one item is produced
    /// per requested type, all five when `feedback_types` is `None`.
    pub async fn simulate_feedback(
        &self,
        query: &str,
        response: &str,
        evaluation: Option<&QualityEvaluation>,
        feedback_types: Option<&[FeedbackType]>,
        probability: Option<f64>,
    ) -> Vec<UserFeedback> {
        let probability = probability.unwrap_or(self.probability);
        let probability = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
        let types = feedback_types.unwrap_or(ALL_FEEDBACK_TYPES.as_slice());

        let feedback: Vec<UserFeedback> = {
            let mut rng = self.rng.lock().await;
            if !rng.gen_bool(probability) {
                debug!(query_len = query.len(), "no feedback given");
                return Vec::new();
            }
            types
                .iter()
                .map(|&feedback_type| self.generate(&mut rng, feedback_type, evaluation))
                .collect()
        };

        debug!(
            count = feedback.len(),
            response_len = response.len(),
            "simulated feedback"
        );
        self.history.write().await.extend(feedback.iter().cloned());
        feedback
    }

    fn generate(
        &self,
        rng: &mut StdRng,
        feedback_type: FeedbackType,
        evaluation: Option<&QualityEvaluation>,
    ) -> UserFeedback {
        let overall = evaluation.and_then(|e| e.overall_score);
        let feedback = match feedback_type {
            FeedbackType::Rating => self.simulate_rating(rng, overall),
            FeedbackType::Thumbs => simulate_thumbs(rng, overall),
            FeedbackType::Comment => simulate_comment(rng, overall),
            FeedbackType::Correction => simulate_correction(rng, evaluation),
            FeedbackType::FollowUp => simulate_follow_up(rng, evaluation),
        };
        match overall {
            Some(score) => feedback.with_metadata("overall_score", score),
            None => feedback,
        }
    }

    fn simulate_rating(&self, rng: &mut StdRng, overall: Option<f64>) -> UserFeedback {
        let scale = self.rating_scale;
        let rating = match overall {
            // halves go to the even rating
            Some(score) => ((score * f64::from(scale)).round_ties_even() as u32).clamp(1, scale),
            None => {
                let weights: Vec<f64> = (0..scale as usize)
                    .map(|i| RATING_WEIGHTS[i.min(RATING_WEIGHTS.len() - 1)])
                    .collect();
                WeightedIndex::new(&weights)
                    .map(|dist| dist.sample(rng) as u32 + 1)
                    .unwrap_or(scale)
            }
        };

        let rating_f = f64::from(rating);
        let scale_f = f64::from(scale);
        let sentiment = if rating_f > 0.7 * scale_f {
            Sentiment::Positive
        } else if rating_f > 0.4 * scale_f {
            Sentiment::Neutral
        } else {
            Sentiment::Negative
        };

        UserFeedback::new(
            FeedbackType::Rating,
            FeedbackContent::Rating { rating, scale },
            sentiment,
        )
    }

    pub async fn history(&self) -> Vec<UserFeedback> {
        self.history.read().await.clone()
    }

    pub async fn clear_history(&self) {
        self.history.write().await.clear();
    }

    /// History entries matching every given criterion.
    pub async fn filter_feedback(
        &self,
        feedback_type: Option<FeedbackType>,
        sentiment: Option<Sentiment>,
    ) -> Vec<UserFeedback> {
        self.history
            .read()
            .await
            .iter()
            .filter(|f| feedback_type.is_none_or(|t| f.feedback_type == t))
            .filter(|f| sentiment.is_none_or(|s| f.sentiment == s))
            .cloned()
            .collect()
    }

    pub async fn feedback_statistics(&self) -> FeedbackStatistics {
        let history = self.history.read().await;
        let total = history.len();
        if total == 0 {
            return FeedbackStatistics::default();
        }

        let mut sentiments: HashMap<Sentiment, usize> = HashMap::new();
        let mut types: HashMap<FeedbackType, usize> = HashMap::new();
        for feedback in history.iter() {
            *sentiments.entry(feedback.sentiment).or_default() += 1;
            *types.entry(feedback.feedback_type).or_default() += 1;
        }

        let ratings: Vec<f64> = history
            .iter()
            .filter_map(|f| f.rating())
            .map(f64::from)
            .collect();
        let thumbs: Vec<bool> = history.iter().filter_map(|f| f.thumbs_up()).collect();

        let fraction = |count: usize| count as f64 / total as f64;
        FeedbackStatistics {
            total,
            sentiment_distribution: sentiments
                .into_iter()
                .map(|(k, v)| (k, fraction(v)))
                .collect(),
            type_distribution: types.into_iter().map(|(k, v)| (k, fraction(v))).collect(),
            average_rating: (!ratings.is_empty())
                .then(|| ratings.iter().sum::<f64>() / ratings.len() as f64),
            thumbs_up_ratio: (!thumbs.is_empty())
                .then(|| thumbs.iter().filter(|&&up| up).count() as f64 / thumbs.len() as f64),
        }
    }
}

fn simulate_thumbs(rng: &mut StdRng, overall: Option<f64>) -> UserFeedback {
    let thumbs_up = match overall {
        Some(score) => score >= THUMBS_UP_THRESHOLD,
        None => rng.gen_bool(RANDOM_THUMBS_UP_PROBABILITY),
    };
    let sentiment = if thumbs_up {
        Sentiment::Positive
    } else {
        Sentiment::Negative
    };
    UserFeedback::new(
        FeedbackType::Thumbs,
        FeedbackContent::Thumbs { thumbs_up },
        sentiment,
    )
}

fn simulate_comment(rng: &mut StdRng, overall: Option<f64>) -> UserFeedback {
    let sentiment = match overall {
        Some(score) if score >= POSITIVE_COMMENT_THRESHOLD => Sentiment::Positive,
        Some(score) if score >= NEUTRAL_COMMENT_THRESHOLD => Sentiment::Neutral,
        Some(_) => Sentiment::Negative,
        None => COMMENT_SENTIMENT_WEIGHTS
            .choose_weighted(rng, |(_, weight)| *weight)
            .map(|(sentiment, _)| *sentiment)
            .unwrap_or(Sentiment::Neutral),
    };
    let comment = comments_for(sentiment)
        .choose(rng)
        .copied()
        .unwrap_or_default()
        .to_string();
    UserFeedback::new(
        FeedbackType::Comment,
        FeedbackContent::Comment { comment },
        sentiment,
    )
}

/// Needs correction when accuracy or correctness scored below threshold.
fn simulate_correction(rng: &mut StdRng, evaluation: Option<&QualityEvaluation>) -> UserFeedback {
    let scored: Vec<f64> = [QualityDimension::Accuracy, QualityDimension::Correctness]
        .into_iter()
        .filter_map(|d| evaluation.and_then(|e| e.normalized_score_for(d)))
        .collect();
    let needs_correction = if scored.is_empty() {
        rng.gen_bool(RANDOM_CORRECTION_PROBABILITY)
    } else {
        scored.iter().any(|&s| s < CORRECTION_THRESHOLD)
    };
    let correction = needs_correction
        .then(|| CORRECTIONS.choose(rng).map(|s| s.to_string()))
        .flatten();
    let sentiment = if needs_correction {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    };
    UserFeedback::new(
        FeedbackType::Correction,
        FeedbackContent::Correction {
            needs_correction,
            correction,
        },
        sentiment,
    )
}

fn simulate_follow_up(rng: &mut StdRng, evaluation: Option<&QualityEvaluation>) -> UserFeedback {
    let needs_follow_up =
        match evaluation.and_then(|e| e.normalized_score_for(QualityDimension::Completeness)) {
            Some(score) => score < FOLLOW_UP_THRESHOLD,
            None => rng.gen_bool(RANDOM_FOLLOW_UP_PROBABILITY),
        };
    let follow_up = needs_follow_up
        .then(|| FOLLOW_UPS.choose(rng).map(|s| s.to_string()))
        .flatten();
    UserFeedback::new(
        FeedbackType::FollowUp,
        FeedbackContent::FollowUp {
            needs_follow_up,
            follow_up,
        },
        Sentiment::Neutral,
    )
}
