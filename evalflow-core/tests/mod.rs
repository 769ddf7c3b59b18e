mod dataset_tests;
mod pipeline_tests;

use std::sync::Arc;

use evalflow_core::{
    config::EvaluationConfig,
    dataset::{ReferenceDatasetManager, storage::InMemoryStorage},
    feedback::FeedbackSimulator,
    pipeline::{EvaluationPipeline, PipelineServices},
    quality::QualityEvaluator,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

pub const BOEING_QUERY: &str = "What is the recommended tire pressure for a Boeing 737?";
pub const BOEING_RESPONSE: &str = "For a Boeing 737 the main gear tires take 200 psi and the \
    nose gear tires take 180 psi. Always confirm the tire pressure in the maintenance manual.";

pub fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|t| t.to_string()).collect()
}

/// Pipeline over in-memory datasets with a seeded feedback simulator.
pub async fn memory_pipeline(config: EvaluationConfig) -> EvaluationPipeline {
    let manager = ReferenceDatasetManager::new(Box::new(InMemoryStorage::new())).await;
    EvaluationPipeline::new(PipelineServices {
        dataset_manager: Arc::new(manager),
        evaluator: Arc::new(QualityEvaluator::new(config.max_score)),
        feedback_simulator: Arc::new(FeedbackSimulator::new(&config.feedback)),
        config,
    })
}

/// The Boeing 737 tire dataset used across tests.
pub async fn add_boeing_dataset(manager: &ReferenceDatasetManager) {
    manager
        .create_dataset("b737", "Boeing 737 tire maintenance")
        .await
        .unwrap();
    manager
        .add_fact("b737", "main", "200 psi", &tags(&["tires", "main"]))
        .await
        .unwrap();
    manager
        .add_fact("b737", "nose", "180 psi", &tags(&["tires", "nose"]))
        .await
        .unwrap();
    for element in [
        "tire pressure",
        "main landing gear",
        "nose landing gear",
        "maintenance manual",
    ] {
        manager
            .add_required_element("b737", element, &tags(&["tires"]))
            .await
            .unwrap();
    }
    manager
        .add_unsafe_pattern("b737", "skip the inspection", &tags(&["safety"]))
        .await
        .unwrap();
    manager
        .add_query_response("b737", BOEING_QUERY, BOEING_RESPONSE, &tags(&["tires"]))
        .await
        .unwrap();
}
