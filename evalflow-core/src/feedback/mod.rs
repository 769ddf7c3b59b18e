//! Synthetic user feedback calibrated to quality evaluations.

pub mod simulator;
pub mod templates;
pub mod types;

pub use simulator::FeedbackSimulator;
pub use types::{FeedbackContent, FeedbackStatistics, FeedbackType, Sentiment, UserFeedback};
