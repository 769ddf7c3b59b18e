//! Stage handlers and hooks.
//!
//! Both are [`StageHandler`]s. Each stage runs its hooks first, highest
//! priority first, then its single handler. Any plain closure over
//! `&mut EvaluationContext` returning [`Result<()>`] is a handler too.
//!
//! ```
//! use evalflow_core::error::Result;
//! use evalflow_core::pipeline::{EvaluationContext, StageHandler};
//!
//! let tag_run = |ctx: &mut EvaluationContext| -> Result<()> {
//!     ctx.metadata.insert("run".to_string(), "nightly".into());
//!     Ok(())
//! };
//! fn assert_handler(_: &impl StageHandler) {}
//! assert_handler(&tag_run);
//! ```

use async_trait::async_trait;
use tracing::info;

use super::context::EvaluationContext;
use crate::error::Result;

#[mockall::automock]
#[async_trait]
pub trait StageHandler: Send + Sync {
    /// Runs against the shared context. An error aborts the whole evaluation.
    async fn handle(&self, context: &mut EvaluationContext) -> Result<()>;
}

#[async_trait]
impl<F> StageHandler for F
where
    F: Fn(&mut EvaluationContext) -> Result<()> + Send + Sync,
{
    async fn handle(&self, context: &mut EvaluationContext) -> Result<()> {
        self(context)
    }
}

/// Default Preparation and Analysis handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

#[async_trait]
impl StageHandler for NoopHandler {
    async fn handle(&self, _context: &mut EvaluationContext) -> Result<()> {
        Ok(())
    }
}

/// Resolves reference data and scores the pair.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsHandler;

#[async_trait]
impl StageHandler for MetricsHandler {
    async fn handle(&self, context: &mut EvaluationContext) -> Result<()> {
        context.compute_evaluation().await;
        Ok(())
    }
}

/// Simulates user feedback for the computed evaluation.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeedbackHandler;

#[async_trait]
impl StageHandler for FeedbackHandler {
    async fn handle(&self, context: &mut EvaluationContext) -> Result<()> {
        context.compute_feedback().await;
        Ok(())
    }
}

/// Logs the outcome of the run.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReportingHandler;

#[async_trait]
impl StageHandler for ReportingHandler {
    async fn handle(&self, context: &mut EvaluationContext) -> Result<()> {
        let overall = context.evaluation.as_ref().and_then(|e| e.overall_score);
        let feedback = context.feedback.as_ref().map_or(0, Vec::len);
        match overall {
            Some(score) => info!(overall = score, feedback, "evaluation complete"),
            None => info!(feedback, "evaluation complete without an overall score"),
        }
        Ok(())
    }
}
