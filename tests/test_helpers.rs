// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、记录构造、编排器装配等功能
// ==========================================

#![allow(dead_code)]

use estate_bulk_import::config::ImportConfig;
use estate_bulk_import::domain::{ImportProgress, RawRecord};
use estate_bulk_import::importer::{ImportOrchestrator, ProgressObserver};
use estate_bulk_import::repository::{InMemoryEntityStore, SqliteEntityStore};
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::{NamedTempFile, TempDir};

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时路径不是 UTF-8")?
        .to_string();

    // 建表
    SqliteEntityStore::new(&db_path)?;

    Ok((temp_file, db_path))
}

/// 在临时目录中写入 CSV 文件（文件名决定工作表名）
pub fn write_csv(dir: &TempDir, file_name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(file_name);
    fs::write(&path, content).expect("写入 CSV 失败");
    path
}

/// 业主记录（行号从 2 开始）
pub fn owner_records(names: &[&str]) -> Vec<RawRecord> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| RawRecord::from_pairs(i + 2, &[("name", name), ("owner_type", "COMPANY")]))
        .collect()
}

/// 楼栋记录
pub fn building_record(position: usize, name: &str, owner_name: &str) -> RawRecord {
    RawRecord::from_pairs(
        position,
        &[
            ("name", name),
            ("address", "1 rue de Test, Paris"),
            ("owner_name", owner_name),
            ("floors", "5"),
            ("year_built", "2001"),
        ],
    )
}

/// 小批次测试配置
pub fn test_config() -> ImportConfig {
    ImportConfig {
        batch_size: 10,
        ..ImportConfig::default()
    }
}

/// 基于内存存储的编排器
pub fn in_memory_orchestrator(
    config: ImportConfig,
) -> (Arc<InMemoryEntityStore>, ImportOrchestrator) {
    let store = Arc::new(InMemoryEntityStore::new());
    let orchestrator = ImportOrchestrator::new(config, store.clone());
    (store, orchestrator)
}

/// 记录所有进度快照的观察者
#[derive(Default)]
pub struct RecordingObserver {
    snapshots: Mutex<Vec<ImportProgress>>,
}

impl RecordingObserver {
    pub fn snapshots(&self) -> Vec<ImportProgress> {
        self.snapshots.lock().unwrap().clone()
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_progress(&self, progress: &ImportProgress) {
        self.snapshots.lock().unwrap().push(progress.clone());
    }
}
