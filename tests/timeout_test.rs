// ==========================================
// 全局超时测试
// ==========================================
// 测试目标: 超时终态、截止后不再启动新批次、迟到结果不覆盖 TIMEOUT
// 时钟: start_paused,时间只随等待推进
// ==========================================

mod test_helpers;

use estate_bulk_import::config::ImportConfig;
use estate_bulk_import::domain::{EntityType, ErrorType, ImportStatus};
use estate_bulk_import::importer::{ImportOptions, ImportOrchestrator};
use estate_bulk_import::repository::InMemoryEntityStore;
use std::sync::Arc;
use std::time::Duration;
use test_helpers::*;

/// 每次存储调用 100ms: 每行 = 查询 + 创建 = 200ms
fn slow_orchestrator(timeout_ms: u64) -> (Arc<InMemoryEntityStore>, ImportOrchestrator) {
    let store = Arc::new(InMemoryEntityStore::new().with_latency(Duration::from_millis(100)));
    let config = ImportConfig {
        timeout_ms,
        batch_size: 1,
        ..ImportConfig::default()
    };
    let orchestrator = ImportOrchestrator::new(config, store.clone());
    (store, orchestrator)
}

#[tokio::test(start_paused = true)]
async fn test_deadline_produces_timeout_status() {
    let (store, orchestrator) = slow_orchestrator(250);
    let names: Vec<String> = (0..10).map(|i| format!("Owner {}", i)).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();

    let result = orchestrator
        .import_records(EntityType::Owner, owner_records(&refs), ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(result.status, ImportStatus::Timeout);
    assert!(!result.success);
    assert_eq!(result.total_rows, 10);
    assert_eq!(result.successful_rows, 1);
    assert_eq!(result.failed_rows, 9);

    let timeout = result
        .errors
        .iter()
        .find(|e| e.error_type == ErrorType::Timeout)
        .expect("缺少超时错误");
    assert_eq!(timeout.code, "IMPORT_TIMEOUT");
    assert!(timeout.is_critical());

    // 截止时在途的行仍会完成,但之后不再启动新批次
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(store.count(EntityType::Owner), 2);

    // 迟到的批次结果不能覆盖终态
    let progress = orchestrator.tracker().get(&result.import_id).unwrap();
    assert_eq!(progress.status, ImportStatus::Timeout);
    assert_eq!(progress.successful_rows, 1);
}

#[tokio::test(start_paused = true)]
async fn test_fast_import_completes_before_deadline() {
    let (store, orchestrator) = slow_orchestrator(10_000);

    let result = orchestrator
        .import_records(
            EntityType::Owner,
            owner_records(&["A", "B", "C"]),
            ImportOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(result.status, ImportStatus::Completed);
    assert!(result.success);
    assert_eq!(store.count(EntityType::Owner), 3);
    assert!(result.processing_time_ms >= 600);
}
