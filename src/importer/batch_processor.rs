// ==========================================
// 物业批量导入系统 - 批次处理器
// ==========================================
// 职责: 按批执行行创建,汇总成功 / 失败计数与分类错误
// 规则:
// - 启用并行且批内行数 > 并行阈值 → 有界并发（全部完成后汇总,不因单行失败中断）
// - 否则按源顺序逐行执行
// - 单行失败经错误分类器隔离; DUPLICATE（WARNING）计为成功
// ==========================================

use crate::config::ImportConfig;
use crate::domain::{BatchResult, Entity, EntityRow, Severity};
use crate::importer::error::RowError;
use crate::importer::error_classifier;
use futures::stream::{self, StreamExt};
use std::future::Future;

/// 批次执行选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub enable_parallel: bool,
    pub parallel_threshold: usize,
    pub max_concurrency: usize,
}

impl BatchOptions {
    pub fn from_config(config: &ImportConfig) -> Self {
        Self {
            enable_parallel: config.enable_parallel_processing,
            parallel_threshold: config.parallel_threshold,
            max_concurrency: config.max_concurrency.max(1),
        }
    }

    /// 该批次是否并行执行
    pub fn runs_parallel(&self, rows: usize) -> bool {
        self.enable_parallel && rows > self.parallel_threshold
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from_config(&ImportConfig::default())
    }
}

/// 按批次大小切分（保持源顺序）
pub fn split_batches<T>(rows: Vec<T>, batch_size: usize) -> Vec<Vec<T>> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(rows.len().div_ceil(batch_size));
    let mut current = Vec::with_capacity(batch_size);

    for row in rows {
        current.push(row);
        if current.len() == batch_size {
            batches.push(std::mem::replace(&mut current, Vec::with_capacity(batch_size)));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// 单行结果（含分类所需的行信息）
struct RowOutcome {
    position: usize,
    key_field: &'static str,
    key: Option<String>,
    result: Result<Entity, RowError>,
}

fn tally(batch: &mut BatchResult, outcome: RowOutcome) {
    batch.processed_rows += 1;

    let error = match outcome.result {
        Ok(_) => {
            batch.successful_rows += 1;
            batch.created_rows += 1;
            return;
        }
        Err(error) => error,
    };

    // 存储层错误不带字段信息时,归到自然键字段
    let (field, value) = match error.field() {
        Some(_) => (None, None),
        None => (Some(outcome.key_field), outcome.key.as_deref()),
    };
    let classified = error_classifier::classify(&error, outcome.position, field, value);

    if classified.severity == Severity::Warning {
        batch.successful_rows += 1;
        batch.duplicate_rows += 1;
    }
    batch.errors.push(classified);
}

/// 执行一个批次
///
/// # 参数
/// - rows: 批内的类型化行
/// - create: 行创建函数
/// - options: 并行选项
///
/// # 返回
/// 批次汇总; 每行恰好计入成功或失败之一
pub async fn process_batch<F, Fut>(
    rows: Vec<EntityRow>,
    create: F,
    options: &BatchOptions,
) -> BatchResult
where
    F: Fn(EntityRow) -> Fut,
    Fut: Future<Output = Result<Entity, RowError>>,
{
    let parallel = options.runs_parallel(rows.len());
    tracing::debug!(rows = rows.len(), parallel, "执行批次");

    let run = |row: EntityRow| {
        let position = row.position();
        let key_field = row.natural_key_field();
        let key = row.natural_key().map(str::to_string);
        let fut = create(row);
        async move {
            RowOutcome {
                position,
                key_field,
                key,
                result: fut.await,
            }
        }
    };

    let mut batch = BatchResult::default();

    if parallel {
        let outcomes: Vec<RowOutcome> = stream::iter(rows)
            .map(run)
            .buffer_unordered(options.max_concurrency)
            .collect()
            .await;
        for outcome in outcomes {
            tally(&mut batch, outcome);
        }
        batch.errors.sort_by_key(|e| e.position);
    } else {
        for row in rows {
            let outcome = run(row).await;
            tally(&mut batch, outcome);
        }
    }

    batch
}
