// ==========================================
// 单类型导入流水线测试
// ==========================================
// 测试目标: 校验闸门、逐行记账、缓存容量、重复检测、进度
// ==========================================

mod test_helpers;

use estate_bulk_import::config::ImportConfig;
use estate_bulk_import::domain::{
    EntityType, ErrorType, ImportStatus, NewEntity, NewOwner, PartyType, RawRecord, Severity,
};
use estate_bulk_import::importer::{EntityCaches, ImportOptions, ValidationPolicy};
use estate_bulk_import::logging;
use estate_bulk_import::repository::{EntityStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use test_helpers::*;

#[tokio::test]
async fn test_gate_blocks_creation_when_any_row_is_invalid() {
    logging::init_test();
    let (store, orchestrator) = in_memory_orchestrator(test_config());

    let result = orchestrator
        .import_records(
            EntityType::Owner,
            owner_records(&["Alpha", "", "Beta"]),
            ImportOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(result.status, ImportStatus::Failed);
    assert!(!result.success);
    assert_eq!(result.total_rows, 3);
    assert_eq!(result.successful_rows, 0);
    assert_eq!(result.failed_rows, 3);
    assert_eq!(store.create_count(), 0);
    assert_eq!(store.lookup_count(), 0);

    let blank = result
        .errors
        .iter()
        .find(|e| e.is_critical())
        .expect("缺少校验错误");
    assert_eq!(blank.position, 3);
    assert_eq!(blank.field, "name");
    assert_eq!(blank.error_type, ErrorType::Validation);
}

#[tokio::test]
async fn test_skip_invalid_rows_creates_the_rest() {
    let (store, orchestrator) = in_memory_orchestrator(test_config());

    let result = orchestrator
        .import_records(
            EntityType::Owner,
            owner_records(&["Alpha", "", "Beta"]),
            ImportOptions::default().with_policy(ValidationPolicy::SkipInvalidRows),
        )
        .await
        .unwrap();

    assert_eq!(result.status, ImportStatus::Completed);
    assert!(!result.success);
    assert_eq!(result.successful_rows, 2);
    assert_eq!(result.failed_rows, 1);
    assert_eq!(result.error_statistics.validation_errors, 1);
    assert_eq!(store.count(EntityType::Owner), 2);
}

#[tokio::test]
async fn test_every_row_is_counted_once() {
    let (store, orchestrator) = in_memory_orchestrator(ImportConfig {
        batch_size: 2,
        ..ImportConfig::default()
    });
    store.fail_on_create("Broken", StoreError::InternalError("disk full".into()));

    let result = orchestrator
        .import_records(
            EntityType::Owner,
            owner_records(&["A", "B", "Broken", "C", "D"]),
            ImportOptions::default(),
        )
        .await
        .unwrap();

    let error_rows = result.errors.iter().filter(|e| e.is_critical()).count();
    assert_eq!(result.successful_rows + error_rows, result.total_rows);
    assert_eq!(result.successful_rows, 4);
    assert_eq!(result.failed_rows, 1);

    let failure = &result.errors[0];
    assert_eq!(failure.position, 4);
    assert_eq!(failure.error_type, ErrorType::System);
    assert_eq!(failure.value.as_deref(), Some("Broken"));
    assert_eq!(result.status, ImportStatus::Completed);
    assert_eq!(result.performance_metrics.transaction_count, 4);
}

#[tokio::test]
async fn test_hundred_owners_with_small_cache() {
    let caches = Arc::new(EntityCaches::new(10, Duration::from_secs(300)));
    let (store, orchestrator) = in_memory_orchestrator(ImportConfig {
        cache_size: 10,
        batch_size: 25,
        ..ImportConfig::default()
    });
    let orchestrator = orchestrator.with_shared_caches(caches.clone());

    let names: Vec<String> = (0..100).map(|i| format!("Owner {:03}", i)).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();

    let result = orchestrator
        .import_records(EntityType::Owner, owner_records(&refs), ImportOptions::default())
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.successful_rows, 100);
    assert!(store.lookup_count() <= 100);

    let owners = caches.for_type(EntityType::Owner);
    assert_eq!(owners.len(), 10);
    assert_eq!(owners.stats().evictions, 90);
}

#[tokio::test]
async fn test_duplicate_within_upload_is_a_warning() {
    let (store, orchestrator) = in_memory_orchestrator(test_config());

    let result = orchestrator
        .import_records(
            EntityType::Owner,
            owner_records(&["Acme", "Zenith", "ACME"]),
            ImportOptions::default(),
        )
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.successful_rows, 3);
    assert_eq!(result.error_statistics.duplicates, 1);
    assert_eq!(result.error_statistics.critical_errors, 0);
    assert_eq!(result.performance_metrics.transaction_count, 2);

    let dup = &result.errors[0];
    assert_eq!(dup.position, 4);
    assert_eq!(dup.error_type, ErrorType::Duplicate);
    assert_eq!(dup.severity, Severity::Warning);
    assert_eq!(store.count(EntityType::Owner), 2);
}

#[tokio::test]
async fn test_existing_entity_is_reported_as_duplicate() {
    let (store, orchestrator) = in_memory_orchestrator(test_config());
    store
        .create(NewEntity::Owner(NewOwner {
            name: "Acme".to_string(),
            email: None,
            phone: None,
            address: None,
            owner_type: PartyType::Company,
        }))
        .await
        .unwrap();

    let result = orchestrator
        .import_records(EntityType::Owner, owner_records(&["acme"]), ImportOptions::default())
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.error_statistics.duplicates, 1);
    assert_eq!(store.count(EntityType::Owner), 1);
}

#[tokio::test]
async fn test_warnings_do_not_fail_the_import() {
    let (_store, orchestrator) = in_memory_orchestrator(test_config());
    let records = vec![RawRecord::from_pairs(
        2,
        &[("name", "Acme"), ("email", "not-an-email"), ("owner_type", "ALIEN")],
    )];

    let result = orchestrator
        .import_records(EntityType::Owner, records, ImportOptions::default())
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.status, ImportStatus::Completed);
    assert_eq!(result.error_statistics.warnings, 2);
    assert!(result.errors.iter().all(|e| e.severity == Severity::Warning));
}

#[tokio::test]
async fn test_progress_is_monotonic_and_reaches_completion() {
    let (_store, orchestrator) = in_memory_orchestrator(ImportConfig {
        batch_size: 2,
        ..ImportConfig::default()
    });
    let observer = Arc::new(RecordingObserver::default());
    orchestrator.tracker().subscribe(observer.clone());

    let result = orchestrator
        .import_records(
            EntityType::Owner,
            owner_records(&["A", "B", "C", "D", "E", "F", "G"]),
            ImportOptions::default(),
        )
        .await
        .unwrap();

    let snapshots = observer.snapshots();
    assert!(snapshots.len() >= 4);
    for pair in snapshots.windows(2) {
        assert!(pair[1].processed_rows >= pair[0].processed_rows);
        assert!(pair[1].progress_percentage >= pair[0].progress_percentage);
    }

    let last = snapshots.last().unwrap();
    assert_eq!(last.status, ImportStatus::Completed);
    assert_eq!(last.progress_percentage, 100);
    assert_eq!(last.processed_rows, 7);

    let progress = orchestrator.tracker().get(&result.import_id).unwrap();
    assert_eq!(progress.successful_rows, 7);
}

#[tokio::test]
async fn test_parallel_batches_create_every_row() {
    let (store, orchestrator) = in_memory_orchestrator(ImportConfig {
        batch_size: 30,
        enable_parallel_processing: true,
        max_concurrency: 4,
        ..ImportConfig::default()
    });
    store.fail_on_create("Owner 017", StoreError::InternalError("boom".into()));

    let names: Vec<String> = (0..30).map(|i| format!("Owner {:03}", i)).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();

    let result = orchestrator
        .import_records(EntityType::Owner, owner_records(&refs), ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(result.successful_rows, 29);
    assert_eq!(result.failed_rows, 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].position, 19);
    assert_eq!(store.count(EntityType::Owner), 29);
}

#[tokio::test(start_paused = true)]
async fn test_progress_is_cleaned_up_after_delay() {
    let (_store, orchestrator) = in_memory_orchestrator(ImportConfig {
        cleanup_delay_ms: 1_000,
        ..ImportConfig::default()
    });

    let result = orchestrator
        .import_records(EntityType::Owner, owner_records(&["A"]), ImportOptions::default())
        .await
        .unwrap();
    assert!(orchestrator.tracker().get(&result.import_id).is_some());

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert!(orchestrator.tracker().get(&result.import_id).is_none());
}
