use evalflow_core::{
    config::EvaluationConfig,
    dataset::{
        ReferenceDatasetManager, ReferenceItemType,
        storage::{DatasetStorage, LocalFileSystemConfig, LocalFileSystemStorage},
    },
    pipeline::{EvaluationPipeline, EvaluationRequest},
    quality::QualityDimension,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tempfile::TempDir;

use super::{BOEING_QUERY, BOEING_RESPONSE, add_boeing_dataset, tags};

fn dir_string(temp_dir: &TempDir) -> String {
    temp_dir.path().to_string_lossy().to_string()
}

#[tokio::test]
async fn test_datasets_survive_restart() {
    let temp_dir = TempDir::new().unwrap();
    let before = {
        let manager = ReferenceDatasetManager::from_dir(dir_string(&temp_dir)).await;
        add_boeing_dataset(&manager).await;
        manager.get_reference_data("b737", None)
    };

    let manager = ReferenceDatasetManager::from_dir(dir_string(&temp_dir)).await;
    assert_eq!(manager.list_datasets(), vec!["b737".to_string()]);
    let after = manager.get_reference_data("b737", None);
    assert_eq!(after, before);
    assert_eq!(
        after.facts.keys().collect::<Vec<_>>(),
        vec!["main", "nose"]
    );

    let dataset = manager.get_dataset("b737").unwrap();
    assert_eq!(dataset.description, "Boeing 737 tire maintenance");
    assert_eq!(dataset.items_by_type(ReferenceItemType::RequiredElement).len(), 4);
}

#[tokio::test]
async fn test_dataset_file_layout() {
    let temp_dir = TempDir::new().unwrap();
    let manager = ReferenceDatasetManager::from_dir(dir_string(&temp_dir)).await;
    manager.create_dataset("fleet/a320", "").await.unwrap();
    let id = manager
        .add_fact("fleet/a320", "main", 200, &tags(&["tires"]))
        .await
        .unwrap()
        .unwrap();

    let path = temp_dir.path().join("fleet_a320.json");
    let document: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(document["name"], "fleet/a320");
    let item = &document["items"][&id];
    assert_eq!(item["id"], json!(id));
    assert_eq!(item["type"], "fact");
    assert_eq!(item["content"], json!({"key": "main", "value": 200}));
    assert_eq!(item["tags"], json!(["tires"]));
    assert!(item["created_at"].is_string());
}

#[tokio::test]
async fn test_unreadable_files_are_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let storage = LocalFileSystemStorage::new(LocalFileSystemConfig::new(dir_string(&temp_dir)));
    storage
        .save(&evalflow_core::dataset::ReferenceDataset::new("good", ""))
        .await
        .unwrap();
    std::fs::write(temp_dir.path().join("broken.json"), "{\"name\": ").unwrap();

    let manager = ReferenceDatasetManager::new(Box::new(storage)).await;
    assert_eq!(manager.list_datasets(), vec!["good".to_string()]);
}

#[tokio::test]
async fn test_removed_dataset_is_gone_after_restart() {
    let temp_dir = TempDir::new().unwrap();
    let manager = ReferenceDatasetManager::from_dir(dir_string(&temp_dir)).await;
    manager.create_dataset("keep", "").await.unwrap();
    manager.create_dataset("drop", "").await.unwrap();
    assert!(manager.remove_dataset("drop").await.unwrap());

    let manager = ReferenceDatasetManager::from_dir(dir_string(&temp_dir)).await;
    assert_eq!(manager.list_datasets(), vec!["keep".to_string()]);
}

#[tokio::test]
async fn test_pipeline_from_config_reads_dataset_dir() {
    let datasets = TempDir::new().unwrap();
    {
        let manager = ReferenceDatasetManager::from_dir(dir_string(&datasets)).await;
        add_boeing_dataset(&manager).await;
    }

    let config = EvaluationConfig {
        datasets_dir: dir_string(&datasets),
        default_dimensions: vec![QualityDimension::Accuracy, QualityDimension::Safety],
        ..EvaluationConfig::default()
    };
    let pipeline = EvaluationPipeline::from_config(config).await.unwrap();
    assert_eq!(pipeline.dataset_manager().list_datasets(), vec!["b737".to_string()]);

    let result = pipeline
        .evaluate(
            EvaluationRequest::new(BOEING_QUERY, BOEING_RESPONSE)
                .with_dataset("b737")
                .with_tags(["main"]),
        )
        .await
        .unwrap();
    assert_eq!(
        result.evaluation.dimensions(),
        vec![QualityDimension::Accuracy, QualityDimension::Safety]
    );
    let accuracy = result
        .evaluation
        .score_for(QualityDimension::Accuracy)
        .unwrap();
    assert_eq!(accuracy.metadata["total_facts"], json!(1));
}

#[tokio::test]
async fn test_from_config_rejects_invalid_config() {
    let config = EvaluationConfig {
        max_score: -1.0,
        ..EvaluationConfig::default()
    };
    assert!(EvaluationPipeline::from_config(config).await.is_err());
}
