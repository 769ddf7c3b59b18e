//! # Evaluation pipeline
//!
//! An [`EvaluationPipeline`] runs every query/response pair through five
//! fixed stages:
//!
//! ```text
//! Preparation → Metrics → Feedback → Analysis → Reporting
//! ```
//!
//! Each stage can be disabled, has exactly one [`StageHandler`] and any
//! number of named hooks that run before the handler. Stages share state
//! through the [`EvaluationContext`].

pub mod context;
pub mod evaluation_pipeline;
pub mod handler;
pub mod result;
pub mod stage;

pub use context::{EvaluationContext, EvaluationOptions, EvaluationRequest, PipelineServices};
pub use evaluation_pipeline::EvaluationPipeline;
pub use handler::{
    FeedbackHandler, MetricsHandler, MockStageHandler, NoopHandler, ReportingHandler, StageHandler,
};
pub use result::{EvaluationResult, ResultsFile};
pub use stage::EvaluationStage;
