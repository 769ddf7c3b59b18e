//! # Quality scoring
//!
//! Lexical quality metrics ([`metrics`]) and the [`QualityEvaluator`] that
//! combines them into a weighted, normalized overall score.
//!
//! ```
//! use evalflow_core::quality::{QualityDimension, QualityEvaluator, ReferenceData};
//!
//! let evaluator = QualityEvaluator::default();
//! let reference = ReferenceData::new().with_fact("main", "200 psi");
//! let evaluation = evaluator.score(
//!     "What is the main gear tire pressure?",
//!     "The main gear tire pressure is 200 psi.",
//!     Some(&reference),
//!     Some([QualityDimension::Relevance, QualityDimension::Accuracy].as_slice()),
//!     None,
//! );
//! assert_eq!(evaluation.scores.len(), 2);
//! assert!(evaluation.overall_score.unwrap() > 0.5);
//! ```

pub mod evaluator;
pub mod metrics;
pub mod statistics;
pub mod text;
pub mod types;

pub use evaluator::QualityEvaluator;
pub use statistics::ScoreStatistics;
pub use types::{DEFAULT_MAX_SCORE, QualityDimension, QualityEvaluation, QualityScore, ReferenceData};
