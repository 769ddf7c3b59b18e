use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::IntoEnumIterator;
use uuid::Uuid;

/// Kind of simulated user reaction.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum FeedbackType {
    Rating,
    Thumbs,
    Comment,
    Correction,
    FollowUp,
}

impl FeedbackType {
    pub fn all() -> Vec<Self> {
        Self::iter().collect()
    }
}

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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// Payload of a feedback item. Its shape follows the feedback type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeedbackContent {
    Rating {
        rating: u32,
        scale: u32,
    },
    Thumbs {
        thumbs_up: bool,
    },
    Comment {
        comment: String,
    },
    Correction {
        needs_correction: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        correction: Option<String>,
    },
    FollowUp {
        needs_follow_up: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        follow_up: Option<String>,
    },
}

/// One simulated user reaction to a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFeedback {
    pub id: String,
    #[serde(rename = "type")]
    pub feedback_type: FeedbackType,
    pub content: FeedbackContent,
    pub sentiment: Sentiment,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl UserFeedback {
    pub fn new(feedback_type: FeedbackType, content: FeedbackContent, sentiment: Sentiment) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            feedback_type,
            content,
            sentiment,
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The numeric rating for rating feedback.
    pub fn rating(&self) -> Option<u32> {
        match self.content {
            FeedbackContent::Rating { rating, .. } => Some(rating),
            _ => None,
        }
    }

    pub fn thumbs_up(&self) -> Option<bool> {
        match self.content {
            FeedbackContent::Thumbs { thumbs_up } => Some(thumbs_up),
            _ => None,
        }
    }
}

/// Aggregates over the simulator's feedback history.
///
/// Fractions are relative to `total`. `average_rating` and `thumbs_up_ratio`
/// are `None` when no rating or thumbs feedback exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackStatistics {
    pub total: usize,
    pub sentiment_distribution: HashMap<Sentiment, f64>,
    pub type_distribution: HashMap<FeedbackType, f64>,
    pub average_rating: Option<f64>,
    pub thumbs_up_ratio: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn test_feedback_json_shape() {
        let feedback = UserFeedback::new(
            FeedbackType::FollowUp,
            FeedbackContent::FollowUp {
                needs_follow_up: true,
                follow_up: Some("Could you also cover".to_string()),
            },
            Sentiment::Neutral,
        );
        let value = serde_json::to_value(&feedback).unwrap();
        assert_eq!(value["type"], "follow_up");
        assert_eq!(value["sentiment"], "neutral");
        assert_eq!(
            value["content"],
            json!({"needs_follow_up": true, "follow_up": "Could you also cover"})
        );
    }

    #[test]
    fn test_content_deserializes_by_shape() {
        let rating: FeedbackContent =
            serde_json::from_value(json!({"rating": 4, "scale": 5})).unwrap();
        assert_eq!(rating, FeedbackContent::Rating { rating: 4, scale: 5 });

        let correction: FeedbackContent =
            serde_json::from_value(json!({"needs_correction": false})).unwrap();
        assert_eq!(
            correction,
            FeedbackContent::Correction {
                needs_correction: false,
                correction: None
            }
        );
    }

    #[test]
    fn test_type_names() {
        assert_eq!(FeedbackType::FollowUp.to_string(), "follow_up");
        assert_eq!(FeedbackType::from_str("thumbs").unwrap(), FeedbackType::Thumbs);
        assert_eq!(FeedbackType::all().len(), 5);
        assert_eq!(Sentiment::from_str("Negative").unwrap(), Sentiment::Negative);
    }
}
