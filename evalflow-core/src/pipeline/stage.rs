use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// Fixed phases of an evaluation, in execution order.
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
pub enum EvaluationStage {
    Preparation,
    Metrics,
    Feedback,
    Analysis,
    Reporting,
}

impl EvaluationStage {
    /// Every stage in execution order.
    pub fn all() -> Vec<Self> {
        Self::iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        let stages = EvaluationStage::all();
        assert_eq!(stages.first(), Some(&EvaluationStage::Preparation));
        assert_eq!(stages.last(), Some(&EvaluationStage::Reporting));
        assert!(stages.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(EvaluationStage::Metrics.to_string(), "metrics");
    }
}
