use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::context::{EvaluationContext, EvaluationOptions, EvaluationRequest, PipelineServices};
use super::handler::{FeedbackHandler, MetricsHandler, NoopHandler, ReportingHandler, StageHandler};
use super::result::{EvaluationResult, ResultsFile};
use super::stage::EvaluationStage;
use crate::config::EvaluationConfig;
use crate::dataset::ReferenceDatasetManager;
use crate::dataset::storage::sanitize_name;
use crate::error::{Error, Result};
use crate::feedback::FeedbackSimulator;
use crate::quality::QualityEvaluator;

struct StageHook {
    name: String,
    priority: i32,
    handler: Arc<dyn StageHandler>,
}

struct StageEntry {
    enabled: bool,
    handler: Arc<dyn StageHandler>,
    hooks: Vec<StageHook>,
}

impl StageEntry {
    fn with_default_handler(stage: EvaluationStage) -> Self {
        let handler: Arc<dyn StageHandler> = match stage {
            EvaluationStage::Metrics => Arc::new(MetricsHandler),
            EvaluationStage::Feedback => Arc::new(FeedbackHandler),
            EvaluationStage::Reporting => Arc::new(ReportingHandler),
            EvaluationStage::Preparation | EvaluationStage::Analysis => Arc::new(NoopHandler),
        };
        Self {
            enabled: true,
            handler,
            hooks: Vec::new(),
        }
    }
}

/// Runs query/response pairs through the five evaluation stages and keeps
/// every result until it is cleared or saved.
///
/// Stages are configured through `&mut self` before use; evaluation itself
/// only needs `&self`, so one pipeline can serve concurrent evaluations.
pub struct EvaluationPipeline {
    services: Arc<PipelineServices>,
    stages: BTreeMap<EvaluationStage, StageEntry>,
    results: RwLock<Vec<EvaluationResult>>,
}

impl EvaluationPipeline {
    pub fn new(services: PipelineServices) -> Self {
        let stages = EvaluationStage::all()
            .into_iter()
            .map(|stage| (stage, StageEntry::with_default_handler(stage)))
            .collect();
        Self {
            services: Arc::new(services),
            stages,
            results: RwLock::new(Vec::new()),
        }
    }

    /// Builds every service from `config`, loading datasets from `datasets_dir`.
    pub async fn from_config(config: EvaluationConfig) -> Result<Self> {
        config.validate()?;
        let dataset_manager = ReferenceDatasetManager::from_dir(config.datasets_dir.clone()).await;
        let evaluator = QualityEvaluator::new(config.max_score)
            .with_default_dimensions(config.default_dimensions.clone());
        let feedback_simulator = FeedbackSimulator::new(&config.feedback);
        Ok(Self::new(PipelineServices {
            dataset_manager: Arc::new(dataset_manager),
            evaluator: Arc::new(evaluator),
            feedback_simulator: Arc::new(feedback_simulator),
            config,
        }))
    }

    pub fn services(&self) -> &PipelineServices {
        &self.services
    }

    pub fn dataset_manager(&self) -> &Arc<ReferenceDatasetManager> {
        &self.services.dataset_manager
    }

    pub fn evaluator(&self) -> &Arc<QualityEvaluator> {
        &self.services.evaluator
    }

    pub fn feedback_simulator(&self) -> &Arc<FeedbackSimulator> {
        &self.services.feedback_simulator
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.services.config
    }

    fn stage_mut(&mut self, stage: EvaluationStage) -> &mut StageEntry {
        self.stages
            .entry(stage)
            .or_insert_with(|| StageEntry::with_default_handler(stage))
    }

    pub fn enable_stage(&mut self, stage: EvaluationStage) {
        self.stage_mut(stage).enabled = true;
    }

    pub fn disable_stage(&mut self, stage: EvaluationStage) {
        self.stage_mut(stage).enabled = false;
    }

    pub fn is_stage_enabled(&self, stage: EvaluationStage) -> bool {
        self.stages.get(&stage).is_some_and(|entry| entry.enabled)
    }

    /// Replaces the handler bound to `stage`.
    pub fn set_handler(&mut self, stage: EvaluationStage, handler: impl StageHandler + 'static) {
        self.stage_mut(stage).handler = Arc::new(handler);
    }

    /// Registers a hook that runs before the stage handler.
    ///
    /// Higher priorities run first and equal priorities keep registration
    /// order. A hook with the same name on the same stage is replaced.
    pub fn add_hook(
        &mut self,
        stage: EvaluationStage,
        name: impl Into<String>,
        priority: i32,
        hook: impl StageHandler + 'static,
    ) {
        let name = name.into();
        let entry = self.stage_mut(stage);
        entry.hooks.retain(|h| h.name != name);
        entry.hooks.push(StageHook {
            name,
            priority,
            handler: Arc::new(hook),
        });
        entry.hooks.sort_by_key(|h| Reverse(h.priority));
    }

    /// Returns `false` when no hook of that name was registered on `stage`.
    pub fn remove_hook(&mut self, stage: EvaluationStage, name: &str) -> bool {
        let entry = self.stage_mut(stage);
        let before = entry.hooks.len();
        entry.hooks.retain(|h| h.name != name);
        entry.hooks.len() != before
    }

    /// Hook names of `stage` in execution order.
    pub fn hook_names(&self, stage: EvaluationStage) -> Vec<String> {
        self.stages
            .get(&stage)
            .map(|entry| entry.hooks.iter().map(|h| h.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Evaluates one pair and appends the result to the result list.
    #[tracing::instrument(level = "debug", skip_all, fields(dataset = ?request.options.reference_dataset))]
    pub async fn evaluate(&self, request: EvaluationRequest) -> Result<EvaluationResult> {
        let result = self.run(request).await?;
        self.results.write().await.push(result.clone());
        Ok(result)
    }

    /// Evaluates pairs in consecutive chunks of `concurrency`.
    ///
    /// The pairs of a chunk are evaluated together and the next chunk starts
    /// once all of them finished. Results keep input order. A `concurrency`
    /// of zero is treated as one.
    #[tracing::instrument(level = "debug", skip(self, queries, responses, options), fields(batch_size = queries.len()))]
    pub async fn evaluate_batch<S: AsRef<str>>(
        &self,
        queries: &[S],
        responses: &[S],
        options: &EvaluationOptions,
        concurrency: usize,
    ) -> Result<Vec<EvaluationResult>> {
        if queries.len() != responses.len() {
            return Err(Error::BatchLengthMismatch {
                queries: queries.len(),
                responses: responses.len(),
            });
        }

        let chunk_size = concurrency.max(1);
        let mut results = Vec::with_capacity(queries.len());
        for (chunk_index, (queries, responses)) in queries
            .chunks(chunk_size)
            .zip(responses.chunks(chunk_size))
            .enumerate()
        {
            debug!(chunk_index, size = queries.len(), "evaluating chunk");
            let runs = queries.iter().zip(responses).map(|(query, response)| {
                self.run(EvaluationRequest {
                    query: query.as_ref().to_string(),
                    response: response.as_ref().to_string(),
                    options: options.clone(),
                })
            });
            let chunk = join_all(runs)
                .await
                .into_iter()
                .collect::<Result<Vec<_>>>()?;
            self.results.write().await.extend(chunk.iter().cloned());
            results.extend(chunk);
        }

        info!("Evaluated batch of {} pairs", results.len());
        Ok(results)
    }

    async fn run(&self, request: EvaluationRequest) -> Result<EvaluationResult> {
        let mut context = EvaluationContext::new(request, Arc::clone(&self.services));

        for (&stage, entry) in &self.stages {
            if !entry.enabled {
                debug!(%stage, "stage disabled");
                continue;
            }
            for hook in &entry.hooks {
                debug!(%stage, hook = %hook.name, priority = hook.priority, "running hook");
                hook.handler.handle(&mut context).await?;
            }
            debug!(%stage, "running stage handler");
            entry.handler.handle(&mut context).await?;

            match stage {
                EvaluationStage::Metrics if context.evaluation.is_none() => {
                    context.compute_evaluation().await;
                }
                EvaluationStage::Feedback if context.feedback.is_none() => {
                    context.compute_feedback().await;
                }
                _ => {}
            }
        }

        Ok(context.into_result())
    }

    /// Stored results whose overall score lies within the bounds.
    ///
    /// Results without an overall score only pass when no bound is given.
    pub async fn get_results(
        &self,
        min_score: Option<f64>,
        max_score: Option<f64>,
    ) -> Vec<EvaluationResult> {
        let unbounded = min_score.is_none() && max_score.is_none();
        self.results
            .read()
            .await
            .iter()
            .filter(|result| {
                unbounded
                    || result.overall_score().is_some_and(|score| {
                        min_score.is_none_or(|min| score >= min)
                            && max_score.is_none_or(|max| score <= max)
                    })
            })
            .cloned()
            .collect()
    }

    pub async fn clear_results(&self) {
        self.results.write().await.clear();
    }

    /// Writes all stored results under the configured output directory.
    ///
    /// Without a file name, `<name>_<YYYYmmdd_HHMMSS>.json` is used. A given
    /// name must be a bare file name; anything with a directory part is rejected.
    pub async fn save_results(&self, filename: Option<&str>) -> Result<PathBuf> {
        let config = &self.services.config;
        let timestamp = Utc::now();
        let filename = match filename {
            Some(name) => bare_file_name(name)?,
            None => format!(
                "{}_{}.json",
                sanitize_name(&config.name),
                timestamp.format("%Y%m%d_%H%M%S")
            ),
        };

        let dir = PathBuf::from(&config.output_dir);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(filename);

        let file = ResultsFile {
            name: config.name.clone(),
            timestamp,
            results: self.results.read().await.clone(),
        };
        tokio::fs::write(&path, serde_json::to_vec_pretty(&file)?).await?;
        info!(
            "Saved {} evaluation results to {}",
            file.results.len(),
            path.display()
        );
        Ok(path)
    }

    /// Reads a file written by [`save_results`](Self::save_results).
    pub async fn load_results(&self, path: impl AsRef<Path>) -> Result<ResultsFile> {
        ResultsFile::load(path).await
    }
}

fn bare_file_name(name: &str) -> Result<String> {
    let path = Path::new(name);
    match path.file_name() {
        Some(file_name) if path.as_os_str() == file_name => {
            Ok(file_name.to_string_lossy().to_string())
        }
        _ => Err(Error::InvalidFileName(name.to_string())),
    }
}
