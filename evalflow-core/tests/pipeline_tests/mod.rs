use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use evalflow_core::{
    Error, Result,
    config::{EvaluationConfig, FeedbackConfig},
    feedback::FeedbackType,
    pipeline::{
        EvaluationContext, EvaluationOptions, EvaluationRequest, EvaluationStage,
        MockStageHandler, StageHandler,
    },
    quality::QualityDimension,
};
use mockall::Sequence;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

use super::{BOEING_QUERY, BOEING_RESPONSE, add_boeing_dataset, memory_pipeline};

fn seeded_config(seed: u64) -> EvaluationConfig {
    EvaluationConfig {
        feedback: FeedbackConfig {
            seed: Some(seed),
            ..FeedbackConfig::default()
        },
        ..EvaluationConfig::default()
    }
}

#[tokio::test]
async fn test_boeing_example_through_pipeline() {
    let pipeline = memory_pipeline(seeded_config(1)).await;
    add_boeing_dataset(pipeline.dataset_manager()).await;

    let result = pipeline
        .evaluate(
            EvaluationRequest::new(BOEING_QUERY, BOEING_RESPONSE)
                .with_dataset("b737")
                .with_tags(["tires"]),
        )
        .await
        .unwrap();

    let evaluation = &result.evaluation;
    assert_eq!(evaluation.dimensions().len(), 9);
    let accuracy = evaluation.score_for(QualityDimension::Accuracy).unwrap();
    assert_eq!(accuracy.score, accuracy.max_score);
    let completeness = evaluation
        .score_for(QualityDimension::Completeness)
        .unwrap();
    assert!(completeness.score < completeness.max_score);

    let overall = result.overall_score().unwrap();
    assert!((0.0..=1.0).contains(&overall));
}

#[tokio::test]
async fn test_reference_dimensions_skipped_without_dataset() {
    let pipeline = memory_pipeline(seeded_config(2)).await;
    let result = pipeline
        .evaluate(EvaluationRequest::new(BOEING_QUERY, BOEING_RESPONSE))
        .await
        .unwrap();
    let dimensions = result.evaluation.dimensions();
    assert_eq!(dimensions.len(), 6);
    assert!(!dimensions.contains(&QualityDimension::Accuracy));
    assert!(!dimensions.contains(&QualityDimension::Completeness));
    assert!(!dimensions.contains(&QualityDimension::Correctness));

    // unknown datasets behave like no reference data at all
    let result = pipeline
        .evaluate(EvaluationRequest::new(BOEING_QUERY, BOEING_RESPONSE).with_dataset("a320"))
        .await
        .unwrap();
    assert_eq!(result.evaluation.dimensions().len(), 6);
}

#[tokio::test]
async fn test_feedback_probability_extremes() {
    let mut always = seeded_config(3);
    always.feedback.probability = 1.0;
    let pipeline = memory_pipeline(always).await;
    let result = pipeline
        .evaluate(
            EvaluationRequest::new("q", "r")
                .with_feedback_types(vec![FeedbackType::Rating, FeedbackType::Thumbs]),
        )
        .await
        .unwrap();
    assert_eq!(result.feedback.len(), 2);
    let rating = result.feedback[0].rating().unwrap();
    assert!((1..=5).contains(&rating));

    let mut never = seeded_config(3);
    never.feedback.probability = 0.0;
    let pipeline = memory_pipeline(never).await;
    for _ in 0..10 {
        let result = pipeline
            .evaluate(EvaluationRequest::new("q", "r"))
            .await
            .unwrap();
        assert!(result.feedback.is_empty());
    }
}

#[tokio::test]
async fn test_batch_keeps_input_order() {
    let pipeline = memory_pipeline(seeded_config(4)).await;
    let queries = vec![
        "How do I reset my password?",
        "What is the capital of France?",
        "How should I store lithium batteries?",
        "Explain the water cycle.",
    ];
    let responses = vec![
        "You can reset your password from the account settings page.",
        "The capital of France is Paris.",
        "Store lithium batteries in a cool, dry place away from metal objects.",
        "Water evaporates, condenses into clouds, and falls as precipitation.",
    ];

    let results = pipeline
        .evaluate_batch(&queries, &responses, &EvaluationOptions::default(), 2)
        .await
        .unwrap();

    assert_eq!(results.len(), 4);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.query, queries[i]);
        assert_eq!(result.response, responses[i]);
    }
    let stored: Vec<String> = pipeline
        .get_results(None, None)
        .await
        .into_iter()
        .map(|r| r.query)
        .collect();
    assert_eq!(stored, queries);
}

struct InFlightCounter {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl StageHandler for InFlightCounter {
    async fn handle(&self, _context: &mut EvaluationContext) -> Result<()> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_batch_bounds_in_flight_evaluations() {
    let mut pipeline = memory_pipeline(seeded_config(5)).await;
    let peak = Arc::new(AtomicUsize::new(0));
    pipeline.add_hook(
        EvaluationStage::Preparation,
        "in-flight",
        0,
        InFlightCounter {
            current: Arc::new(AtomicUsize::new(0)),
            peak: Arc::clone(&peak),
        },
    );

    let queries = ["a", "b", "c", "d", "e"];
    let responses = ["1", "2", "3", "4", "5"];
    let results = pipeline
        .evaluate_batch(&queries, &responses, &EvaluationOptions::default(), 2)
        .await
        .unwrap();
    assert_eq!(results.len(), 5);
    assert_eq!(peak.load(Ordering::SeqCst), 2);

    // zero behaves like sequential evaluation
    peak.store(0, Ordering::SeqCst);
    pipeline
        .evaluate_batch(&queries, &responses, &EvaluationOptions::default(), 0)
        .await
        .unwrap();
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_batch_length_mismatch_is_fatal() {
    let pipeline = memory_pipeline(seeded_config(6)).await;
    let result = pipeline
        .evaluate_batch(&["a", "b", "c"], &["1"], &EvaluationOptions::default(), 2)
        .await;
    assert!(matches!(
        result,
        Err(Error::BatchLengthMismatch {
            queries: 3,
            responses: 1
        })
    ));
    assert!(pipeline.get_results(None, None).await.is_empty());
}

#[tokio::test]
async fn test_hooks_run_by_priority_before_handler() {
    let mut pipeline = memory_pipeline(seeded_config(7)).await;
    let mut seq = Sequence::new();

    let mut first = MockStageHandler::new();
    first
        .expect_handle()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|ctx| {
            ctx.metadata.insert("first".to_string(), json!(true));
            Ok(())
        });
    let mut second = MockStageHandler::new();
    second
        .expect_handle()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|ctx| {
            assert!(ctx.metadata.contains_key("first"));
            Ok(())
        });
    let mut third = MockStageHandler::new();
    third
        .expect_handle()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    let mut handler = MockStageHandler::new();
    handler
        .expect_handle()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|ctx| {
            assert!(ctx.evaluation.is_none());
            Ok(())
        });

    pipeline.add_hook(EvaluationStage::Metrics, "second", 5, second);
    pipeline.add_hook(EvaluationStage::Metrics, "first", 10, first);
    pipeline.add_hook(EvaluationStage::Metrics, "third", 5, third);
    pipeline.set_handler(EvaluationStage::Metrics, handler);
    assert_eq!(
        pipeline.hook_names(EvaluationStage::Metrics),
        vec!["first", "second", "third"]
    );

    let result = pipeline
        .evaluate(EvaluationRequest::new("q", "r"))
        .await
        .unwrap();
    // the handler left no evaluation behind, so the default one is computed
    assert!(!result.evaluation.scores.is_empty());
    assert_eq!(result.metadata["first"], json!(true));
}

#[tokio::test]
async fn test_hook_can_supply_reference_data() {
    let mut pipeline = memory_pipeline(seeded_config(8)).await;
    pipeline.add_hook(
        EvaluationStage::Preparation,
        "inject_reference",
        0,
        |ctx: &mut EvaluationContext| -> Result<()> {
            ctx.reference_data = Some(
                evalflow_core::quality::ReferenceData::new().with_fact("main", "200 psi"),
            );
            Ok(())
        },
    );

    let result = pipeline
        .evaluate(
            EvaluationRequest::new(BOEING_QUERY, BOEING_RESPONSE)
                .with_dimensions(vec![QualityDimension::Accuracy]),
        )
        .await
        .unwrap();
    assert_eq!(
        result.evaluation.dimensions(),
        vec![QualityDimension::Accuracy]
    );
    assert_eq!(result.overall_score(), Some(1.0));
}

#[tokio::test]
async fn test_handler_error_aborts_evaluation() {
    let mut pipeline = memory_pipeline(seeded_config(9)).await;
    let mut failing = MockStageHandler::new();
    failing
        .expect_handle()
        .returning(|_| Err(Error::stage(EvaluationStage::Analysis, "analysis failed")));
    pipeline.set_handler(EvaluationStage::Analysis, failing);

    let err = pipeline
        .evaluate(EvaluationRequest::new("q", "r"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Stage analysis failed: analysis failed");
    assert!(pipeline.get_results(None, None).await.is_empty());
}

#[tokio::test]
async fn test_save_and_load_results() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = seeded_config(10);
    config.name = "nightly run".to_string();
    config.output_dir = temp_dir.path().to_string_lossy().to_string();
    let pipeline = memory_pipeline(config).await;
    add_boeing_dataset(pipeline.dataset_manager()).await;

    pipeline
        .evaluate(EvaluationRequest::new(BOEING_QUERY, BOEING_RESPONSE).with_dataset("b737"))
        .await
        .unwrap();
    pipeline
        .evaluate(EvaluationRequest::new("q", "r").with_metadata("source", "smoke"))
        .await
        .unwrap();

    let path = pipeline.save_results(None).await.unwrap();
    let file_name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(file_name.starts_with("nightly run_"));
    assert!(file_name.ends_with(".json"));

    let loaded = pipeline.load_results(&path).await.unwrap();
    assert_eq!(loaded.name, "nightly run");
    assert_eq!(loaded.results, pipeline.get_results(None, None).await);
    assert_eq!(loaded.results[1].metadata["source"], json!("smoke"));

    let named = pipeline.save_results(Some("fixed.json")).await.unwrap();
    assert_eq!(named, temp_dir.path().join("fixed.json"));
}

#[tokio::test]
async fn test_save_results_rejects_paths_outside_output_dir() {
    let root = TempDir::new().unwrap();
    let output_dir = root.path().join("out");
    let mut config = seeded_config(11);
    config.output_dir = output_dir.to_string_lossy().to_string();
    let pipeline = memory_pipeline(config).await;
    pipeline
        .evaluate(EvaluationRequest::new("q", "r"))
        .await
        .unwrap();

    let escaping = root.path().join("escaped.json");
    for name in [
        "../escaped.json".to_string(),
        "nested/escaped.json".to_string(),
        escaping.to_string_lossy().to_string(),
        "..".to_string(),
    ] {
        let result = pipeline.save_results(Some(&name)).await;
        assert!(
            matches!(result, Err(Error::InvalidFileName(_))),
            "{name} should be rejected"
        );
    }
    assert!(!escaping.exists());
}
