//! # evalflow: response quality evaluation
//!
//! evalflow scores an AI agent's answer to a user query along several quality
//! dimensions, simulates how a user might react to that answer, and runs both
//! through a configurable, stage-based pipeline that also handles batches.
//!
//! ## Building Blocks
//!
//! ### 1. Quality Scoring
//! Lexical metrics for nine dimensions ([`quality::metrics`]) combined into a
//! weighted overall score by the [`quality::QualityEvaluator`]. Accuracy,
//! completeness and correctness need reference data and are skipped without it.
//!
//! ### 2. Reference Datasets
//! Named collections of facts, required elements, unsafe patterns and example
//! answers ([`dataset`]). Every change is written straight back to storage,
//! one JSON document per dataset.
//!
//! ### 3. Feedback Simulation
//! Synthetic ratings, thumbs, comments, corrections and follow-up requests
//! calibrated to an evaluation ([`feedback`]). Seedable for reproducible runs.
//!
//! ### 4. Pipeline
//! Five ordered stages with replaceable handlers and priority-ordered hooks
//! ([`pipeline`]):
//!
//! ```text
//! Preparation → Metrics → Feedback → Analysis → Reporting
//! ```
//!
//! ## Configuration
//!
//! All components can be built from one [`config::EvaluationConfig`], loaded
//! from JSON with [`config::from_file`]:
//!
//! ```no_run
//! use evalflow_core::config::{self, EvaluationConfig};
//! use evalflow_core::pipeline::{EvaluationPipeline, EvaluationRequest};
//!
//! # async fn example() -> evalflow_core::Result<()> {
//! let config: EvaluationConfig = config::from_file("evalflow.json")?;
//! let pipeline = EvaluationPipeline::from_config(config).await?;
//! let result = pipeline
//!     .evaluate(
//!         EvaluationRequest::new(
//!             "What is the main gear tire pressure?",
//!             "The main gear tire pressure is 200 psi.",
//!         )
//!         .with_dataset("b737"),
//!     )
//!     .await?;
//! println!("overall: {:?}", result.overall_score());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod feedback;
pub mod pipeline;
pub mod quality;

// Re-exports
pub use error::{Error, Result};
