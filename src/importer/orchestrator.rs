// ==========================================
// 物业批量导入系统 - 导入编排器
// ==========================================
// 状态机: PENDING → PROCESSING → {COMPLETED | FAILED | TIMEOUT}
// 流程:
// 1. 解析文件,登记进度作业
// 2. 校验闸门: 全部行校验
//    - AbortOnError:    任一 ERROR → FAILED,不发起任何创建
//    - SkipInvalidRows: 无效行记为失败,其余行继续
// 3. 处理阶段: 按依赖顺序逐类型、逐批次执行,每批后更新进度
// 4. 处理阶段在独立任务中运行,与全局超时竞速;
//    超时 → TIMEOUT,后台迟到的结果丢弃,截止后不再开始新批次
// 5. 终态后延迟清理进度记录; 审计在返回结果前写完,失败只记日志不影响结果
// 红线: 多类型上传不做跨类型回滚
// ==========================================

use crate::config::ImportConfig;
use crate::domain::{
    BatchResult, ClassifiedError, EntityRow, EntityType, ErrorStatistics, ImportResult,
    ImportStatus, PerformanceMetrics, RawRecord,
};
use crate::importer::batch_processor::{process_batch, split_batches, BatchOptions};
use crate::importer::entity_cache::EntityCaches;
use crate::importer::error::{ImportError, RowError};
use crate::importer::error_classifier;
use crate::importer::file_parser::{SheetRecords, UniversalFileParser};
use crate::importer::field_mapper::MappedRow;
use crate::importer::progress_tracker::{ProgressTracker, ProgressUpdate};
use crate::importer::row_creator::{create_row, CreationContext};
use crate::importer::validator::RecordValidator;
use crate::perf::PerfGuard;
use crate::repository::{AuditSink, EntityStore, TracingAuditSink};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// 审计动作
pub const AUDIT_ACTION_BULK_IMPORT: &str = "BULK_IMPORT";

// ==========================================
// 校验策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationPolicy {
    /// 任一行存在 ERROR 即整体失败（单类型导入默认）
    AbortOnError,
    /// 跳过无效行,其余行继续（多类型上传默认）
    SkipInvalidRows,
}

/// 单次导入选项
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// 覆盖默认校验策略
    pub validation_policy: Option<ValidationPolicy>,
    /// 操作人（写入审计）
    pub user_id: Option<String>,
}

impl ImportOptions {
    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.validation_policy = Some(policy);
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// 作业结束时的汇总
struct Outcome {
    status: ImportStatus,
    successful_rows: usize,
    created_rows: usize,
    errors: Vec<ClassifiedError>,
    summary: String,
}

// ==========================================
// ImportOrchestrator
// ==========================================
pub struct ImportOrchestrator {
    config: ImportConfig,
    store: Arc<dyn EntityStore>,
    tracker: ProgressTracker,
    validator: Arc<RecordValidator>,
    audit: Arc<dyn AuditSink>,
    shared_caches: Option<Arc<EntityCaches>>,
}

impl ImportOrchestrator {
    /// 创建编排器
    ///
    /// # 参数
    /// - config: 导入配置
    /// - store: 实体存储
    pub fn new(config: ImportConfig, store: Arc<dyn EntityStore>) -> Self {
        let tracker = ProgressTracker::new(config.cleanup_delay());
        Self {
            config,
            store,
            tracker,
            validator: Arc::new(RecordValidator::default()),
            audit: Arc::new(TracingAuditSink),
            shared_caches: None,
        }
    }

    /// 使用外部进度登记表（多个编排器共享查询面）
    pub fn with_tracker(mut self, tracker: ProgressTracker) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn with_validator(mut self, validator: RecordValidator) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// 跨作业共享实体缓存（默认每个作业新建）
    pub fn with_shared_caches(mut self, caches: Arc<EntityCaches>) -> Self {
        self.shared_caches = Some(caches);
        self
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    fn parser(&self) -> UniversalFileParser {
        UniversalFileParser::new(self.config.max_file_size)
    }

    // ==========================================
    // 入口
    // ==========================================

    /// 导入单一实体类型的记录（默认 AbortOnError）
    pub async fn import_records(
        &self,
        entity_type: EntityType,
        records: Vec<RawRecord>,
        options: ImportOptions,
    ) -> Result<ImportResult, ImportError> {
        let policy = options
            .validation_policy
            .unwrap_or(ValidationPolicy::AbortOnError);
        self.run(vec![(entity_type, records)], policy, options).await
    }

    /// 多类型组合上传（默认 SkipInvalidRows,按依赖顺序处理）
    pub async fn import_sheets(
        &self,
        sheets: Vec<(EntityType, Vec<RawRecord>)>,
        options: ImportOptions,
    ) -> Result<ImportResult, ImportError> {
        let policy = options
            .validation_policy
            .unwrap_or(ValidationPolicy::SkipInvalidRows);
        self.run(sheets, policy, options).await
    }

    /// 导入文件
    ///
    /// # 参数
    /// - path: 文件路径（.csv / .xlsx / .xls）
    /// - entity_type: 指定类型时只读首个工作表; 为 None 时按工作表名识别类型
    pub async fn import_file<P: AsRef<Path>>(
        &self,
        path: P,
        entity_type: Option<EntityType>,
        options: ImportOptions,
    ) -> Result<ImportResult, ImportError> {
        let path = path.as_ref();
        info!(file = %path.display(), entity_type = ?entity_type, "开始导入文件");

        match entity_type {
            Some(entity_type) => {
                let records = self.parser().parse(path)?;
                self.import_records(entity_type, records, options).await
            }
            None => self.import_workbook(path, options).await,
        }
    }

    /// 导入多工作表文件（工作表名 → 实体类型）
    pub async fn import_workbook<P: AsRef<Path>>(
        &self,
        path: P,
        options: ImportOptions,
    ) -> Result<ImportResult, ImportError> {
        let sheets = self.parser().parse_workbook(path)?;
        let phases = sheets_to_phases(sheets)?;
        self.import_sheets(phases, options).await
    }

    /// 导入内存中的文件内容
    pub async fn import_bytes(
        &self,
        bytes: &[u8],
        ext: &str,
        entity_type: EntityType,
        options: ImportOptions,
    ) -> Result<ImportResult, ImportError> {
        let records = self.parser().parse_bytes(bytes, ext)?;
        self.import_records(entity_type, records, options).await
    }

    // ==========================================
    // 主流程
    // ==========================================

    #[instrument(skip_all, fields(import_id))]
    async fn run(
        &self,
        mut phases: Vec<(EntityType, Vec<RawRecord>)>,
        policy: ValidationPolicy,
        options: ImportOptions,
    ) -> Result<ImportResult, ImportError> {
        let started = Instant::now();
        phases.sort_by_key(|(entity_type, _)| entity_type.dependency_rank());

        let total_rows: usize = phases.iter().map(|(_, records)| records.len()).sum();
        if total_rows == 0 {
            return Err(ImportError::MalformedInput("上传内容无数据行".to_string()));
        }
        let audit_type = phases
            .first()
            .map(|(entity_type, _)| *entity_type)
            .unwrap_or(EntityType::Owner);

        let import_id = self.tracker.create(total_rows);
        tracing::Span::current().record("import_id", import_id.as_str());
        info!(
            import_id = %import_id,
            total_rows,
            phases = phases.len(),
            policy = ?policy,
            "开始导入"
        );

        // ===== 阶段 1: 校验闸门 =====
        debug!("步骤 1: 校验全部行");
        let (valid_phases, validation_errors, invalid_rows) = self.validate_all(phases);
        info!(
            invalid_rows,
            issues = validation_errors.len(),
            "校验完成"
        );

        if invalid_rows > 0 && policy == ValidationPolicy::AbortOnError {
            warn!(import_id = %import_id, invalid_rows, "校验未通过,终止导入");
            self.tracker.update(
                &import_id,
                ProgressUpdate::counts(total_rows, 0, total_rows)
                    .with_status(ImportStatus::Failed)
                    .with_errors(validation_errors.clone()),
            );
            let outcome = Outcome {
                status: ImportStatus::Failed,
                successful_rows: 0,
                created_rows: 0,
                summary: format!("校验未通过: {} 行存在错误,未创建任何记录", invalid_rows),
                errors: validation_errors,
            };
            return Ok(self
                .finish(import_id, total_rows, outcome, started, audit_type, options)
                .await);
        }

        // ===== 阶段 2: 分批处理（与超时竞速）=====
        debug!("步骤 2: 分批处理");
        self.tracker.update(
            &import_id,
            ProgressUpdate::counts(invalid_rows, 0, invalid_rows)
                .with_status(ImportStatus::Processing)
                .with_errors(validation_errors.clone()),
        );

        let caches = self.shared_caches.clone().unwrap_or_else(|| {
            Arc::new(EntityCaches::new(self.config.cache_size, self.config.cache_ttl()))
        });
        let deadline_passed = Arc::new(AtomicBool::new(false));
        let job = ProcessingJob {
            import_id: import_id.clone(),
            ctx: CreationContext::new(Arc::clone(&self.store), Arc::clone(&caches)),
            tracker: self.tracker.clone(),
            batch_size: self.config.batch_size,
            options: BatchOptions::from_config(&self.config),
            invalid_rows,
            deadline_passed: Arc::clone(&deadline_passed),
        };
        let mut task = tokio::spawn(job.run(valid_phases));

        let limit = self.config.timeout();
        let outcome = tokio::select! {
            joined = &mut task => match joined {
                Ok(batch) => {
                    let successful = batch.successful_rows;
                    let failed = total_rows - successful;
                    self.tracker.update(
                        &import_id,
                        ProgressUpdate::counts(total_rows, successful, failed)
                            .with_status(ImportStatus::Completed),
                    );

                    let summary = format!(
                        "导入完成: 共 {} 行, 成功 {} 行 (新建 {}, 重复 {}), 失败 {} 行",
                        total_rows, successful, batch.created_rows, batch.duplicate_rows, failed
                    );
                    let mut errors = validation_errors;
                    errors.extend(batch.errors);
                    Outcome {
                        status: ImportStatus::Completed,
                        successful_rows: successful,
                        created_rows: batch.created_rows,
                        errors,
                        summary,
                    }
                }
                Err(join_error) => {
                    warn!(import_id = %import_id, error = %join_error, "处理任务异常退出");
                    let system = error_classifier::classify(
                        &RowError::System(join_error.to_string()),
                        0,
                        Some("import"),
                        None,
                    );
                    self.tracker.update(
                        &import_id,
                        ProgressUpdate::status(ImportStatus::Failed).with_errors(vec![system]),
                    );
                    self.terminal_outcome(
                        &import_id,
                        ImportStatus::Failed,
                        validation_errors,
                        format!("导入失败: {}", join_error),
                    )
                }
            },
            _ = tokio::time::sleep(limit) => {
                deadline_passed.store(true, Ordering::SeqCst);
                let elapsed = started.elapsed();
                warn!(
                    import_id = %import_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    limit_ms = limit.as_millis() as u64,
                    "导入超时"
                );
                let timeout_error = error_classifier::timeout(elapsed, limit);
                self.tracker.update(
                    &import_id,
                    ProgressUpdate::status(ImportStatus::Timeout).with_errors(vec![timeout_error]),
                );
                self.terminal_outcome(
                    &import_id,
                    ImportStatus::Timeout,
                    validation_errors,
                    format!("导入超时: 超过 {} ms 上限", limit.as_millis()),
                )
            }
        };

        Ok(self
            .finish(import_id, total_rows, outcome, started, audit_type, options)
            .await)
    }

    /// 校验全部阶段的行
    ///
    /// # 返回
    /// (有效行, 校验问题, 无效行数)
    fn validate_all(
        &self,
        phases: Vec<(EntityType, Vec<RawRecord>)>,
    ) -> (Vec<(EntityType, Vec<EntityRow>)>, Vec<ClassifiedError>, usize) {
        let _perf = PerfGuard::new("import_validation");
        let mut valid_phases = Vec::with_capacity(phases.len());
        let mut errors = Vec::new();
        let mut invalid_rows = 0;

        for (entity_type, records) in phases {
            let mut rows = Vec::with_capacity(records.len());
            for record in &records {
                let MappedRow { row, issues } = self.validator.validate_row(record, entity_type);
                let invalid = issues.iter().any(|issue| issue.is_error());
                errors.extend(issues.iter().map(error_classifier::from_issue));

                if invalid {
                    invalid_rows += 1;
                } else {
                    rows.push(row);
                }
            }
            debug!(entity_type = %entity_type, valid = rows.len(), "类型校验完成");
            valid_phases.push((entity_type, rows));
        }

        (valid_phases, errors, invalid_rows)
    }

    /// 以进度快照构造终态汇总（超时 / 任务异常）
    fn terminal_outcome(
        &self,
        import_id: &str,
        status: ImportStatus,
        validation_errors: Vec<ClassifiedError>,
        summary: String,
    ) -> Outcome {
        let (successful_rows, errors) = match self.tracker.get(import_id) {
            Some(snapshot) => (snapshot.successful_rows, snapshot.errors),
            None => (0, validation_errors),
        };
        let duplicates = ErrorStatistics::from_errors(&errors).duplicates;

        Outcome {
            status,
            successful_rows,
            created_rows: successful_rows.saturating_sub(duplicates),
            errors,
            summary,
        }
    }

    /// 组装结果、安排清理、写审计
    async fn finish(
        &self,
        import_id: String,
        total_rows: usize,
        outcome: Outcome,
        started: Instant,
        audit_type: EntityType,
        options: ImportOptions,
    ) -> ImportResult {
        let processing_time_ms = started.elapsed().as_millis() as u64;
        let error_statistics = ErrorStatistics::from_errors(&outcome.errors);
        let failed_rows = total_rows - outcome.successful_rows.min(total_rows);

        let result = ImportResult {
            success: error_statistics.critical_errors == 0,
            total_rows,
            successful_rows: outcome.successful_rows,
            failed_rows,
            errors: outcome.errors,
            summary: outcome.summary,
            processing_time_ms,
            import_id: import_id.clone(),
            status: outcome.status,
            error_statistics,
            performance_metrics: PerformanceMetrics {
                avg_ms_per_row: processing_time_ms as f64 / total_rows.max(1) as f64,
                transaction_count: outcome.created_rows,
            },
        };

        info!(
            import_id = %import_id,
            status = %result.status,
            success = result.success,
            successful_rows = result.successful_rows,
            failed_rows = result.failed_rows,
            critical_errors = result.error_statistics.critical_errors,
            warnings = result.error_statistics.warnings,
            elapsed_ms = processing_time_ms,
            "导入结束"
        );

        self.tracker.schedule_cleanup(&import_id);

        // 审计: 进程退出前必须落库,失败只记日志
        if let Err(e) = self
            .audit
            .record(
                AUDIT_ACTION_BULK_IMPORT,
                audit_type,
                &import_id,
                &result.summary,
                options.user_id.as_deref(),
            )
            .await
        {
            warn!(import_id = %import_id, error = %e, "审计记录写入失败");
        }

        result
    }
}

/// 工作表名 → 实体类型
fn sheets_to_phases(
    sheets: Vec<SheetRecords>,
) -> Result<Vec<(EntityType, Vec<RawRecord>)>, ImportError> {
    sheets
        .into_iter()
        .map(|sheet| {
            sheet
                .name
                .parse::<EntityType>()
                .map(|entity_type| (entity_type, sheet.records))
                .map_err(|_| ImportError::UnknownEntityType(sheet.name.clone()))
        })
        .collect()
}

// ==========================================
// ProcessingJob - 后台处理任务
// ==========================================
struct ProcessingJob {
    import_id: String,
    ctx: CreationContext,
    tracker: ProgressTracker,
    batch_size: usize,
    options: BatchOptions,
    invalid_rows: usize,
    deadline_passed: Arc<AtomicBool>,
}

impl ProcessingJob {
    async fn run(self, phases: Vec<(EntityType, Vec<EntityRow>)>) -> BatchResult {
        // PerfGuard 依赖线程局部计数,不能跨 await 持有; 这里直接计时
        let started = Instant::now();
        let mut total = BatchResult::default();

        'phases: for (entity_type, rows) in phases {
            let batches = split_batches(rows, self.batch_size);
            debug!(
                import_id = %self.import_id,
                entity_type = %entity_type,
                batches = batches.len(),
                "开始处理实体类型"
            );

            for (batch_index, batch) in batches.into_iter().enumerate() {
                if self.deadline_passed.load(Ordering::SeqCst) {
                    debug!(import_id = %self.import_id, batch_index, "已超时,停止启动新批次");
                    break 'phases;
                }

                let ctx = self.ctx.clone();
                let create = move |row: EntityRow| {
                    let ctx = ctx.clone();
                    async move { create_row(&row, &ctx).await }
                };
                let result = process_batch(batch, create, &self.options).await;

                debug!(
                    import_id = %self.import_id,
                    entity_type = %entity_type,
                    batch_index,
                    processed = result.processed_rows,
                    successful = result.successful_rows,
                    "批次完成"
                );

                let batch_errors = result.errors.clone();
                total.merge(result);
                self.tracker.update(
                    &self.import_id,
                    ProgressUpdate::counts(
                        self.invalid_rows + total.processed_rows,
                        total.successful_rows,
                        self.invalid_rows + total.failed_rows(),
                    )
                    .with_errors(batch_errors),
                );
            }

            self.ctx.caches.log_stats(&self.import_id);
        }

        debug!(
            target: "perf",
            import_id = %self.import_id,
            phase = "import_processing",
            elapsed_ms = started.elapsed().as_millis() as u64,
            processed = total.processed_rows,
            "阶段耗时"
        );
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorType, Severity};
    use crate::repository::{InMemoryEntityStore, StoreError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// 记录审计调用的测试 sink
    #[derive(Default)]
    struct RecordingAuditSink {
        entries: Mutex<Vec<(String, EntityType, String, Option<String>)>>,
    }

    #[async_trait]
    impl AuditSink for RecordingAuditSink {
        async fn record(
            &self,
            action: &str,
            entity_type: EntityType,
            entity_id: &str,
            _summary: &str,
            user_id: Option<&str>,
        ) -> Result<(), StoreError> {
            self.entries.lock().unwrap().push((
                action.to_string(),
                entity_type,
                entity_id.to_string(),
                user_id.map(str::to_string),
            ));
            Ok(())
        }
    }

    /// 总是写入失败的审计 sink
    struct FailingAuditSink;

    #[async_trait]
    impl AuditSink for FailingAuditSink {
        async fn record(
            &self,
            _action: &str,
            _entity_type: EntityType,
            _entity_id: &str,
            _summary: &str,
            _user_id: Option<&str>,
        ) -> Result<(), StoreError> {
            Err(StoreError::InternalError("audit table unavailable".to_string()))
        }
    }

    fn orchestrator(store: Arc<InMemoryEntityStore>) -> ImportOrchestrator {
        ImportOrchestrator::new(ImportConfig::default(), store)
    }

    fn owners(names: &[&str]) -> Vec<RawRecord> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| RawRecord::from_pairs(i + 2, &[("name", name), ("owner_type", "COMPANY")]))
            .collect()
    }

    #[tokio::test]
    async fn test_completed_import() {
        let store = Arc::new(InMemoryEntityStore::new());
        let result = orchestrator(store.clone())
            .import_records(EntityType::Owner, owners(&["A", "B"]), ImportOptions::default())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.status, ImportStatus::Completed);
        assert_eq!(result.successful_rows, 2);
        assert_eq!(result.performance_metrics.transaction_count, 2);
        assert_eq!(store.count(EntityType::Owner), 2);
    }

    #[tokio::test]
    async fn test_validation_gate_blocks_all_creation() {
        let store = Arc::new(InMemoryEntityStore::new());
        let records = vec![
            RawRecord::from_pairs(2, &[("name", "A"), ("email", "a@x.fr")]),
            RawRecord::from_pairs(3, &[("name", ""), ("email", "b@x.fr")]),
            RawRecord::from_pairs(4, &[("name", "B"), ("email", "c@x.fr")]),
        ];

        let result = orchestrator(store.clone())
            .import_records(EntityType::Owner, records, ImportOptions::default())
            .await
            .unwrap();

        assert_eq!(result.status, ImportStatus::Failed);
        assert_eq!(result.total_rows, 3);
        assert_eq!(result.successful_rows, 0);
        assert!(result.error_statistics.critical_errors >= 1);
        assert_eq!(store.create_count(), 0);
        assert_eq!(store.lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_in_upload_duplicate_is_warning() {
        let store = Arc::new(InMemoryEntityStore::new());
        let result = orchestrator(store.clone())
            .import_records(EntityType::Owner, owners(&["A", "a "]), ImportOptions::default())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.successful_rows, 2);
        assert_eq!(result.error_statistics.duplicates, 1);
        assert_eq!(result.errors[0].error_type, ErrorType::Duplicate);
        assert_eq!(result.errors[0].severity, Severity::Warning);
        assert_eq!(store.count(EntityType::Owner), 1);
    }

    #[tokio::test]
    async fn test_accented_names_differing_in_case_are_both_created() {
        let store = Arc::new(InMemoryEntityStore::new());
        let result = orchestrator(store.clone())
            .import_records(EntityType::Owner, owners(&["Élodie", "élodie"]), ImportOptions::default())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.error_statistics.duplicates, 0);
        assert_eq!(result.performance_metrics.transaction_count, 2);
        assert_eq!(store.count(EntityType::Owner), 2);
    }

    #[tokio::test]
    async fn test_empty_upload_is_rejected() {
        let store = Arc::new(InMemoryEntityStore::new());
        let result = orchestrator(store)
            .import_records(EntityType::Owner, Vec::new(), ImportOptions::default())
            .await;

        assert!(matches!(result, Err(ImportError::MalformedInput(_))));
    }

    #[tokio::test]
    async fn test_audit_written_before_result_returned() {
        let store = Arc::new(InMemoryEntityStore::new());
        let audit = Arc::new(RecordingAuditSink::default());
        let result = orchestrator(store)
            .with_audit(audit.clone())
            .import_records(
                EntityType::Owner,
                owners(&["A"]),
                ImportOptions::default().with_user("u-42"),
            )
            .await
            .unwrap();

        // 不让出执行权,直接检查
        let entries = audit.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        let (action, entity_type, entity_id, user_id) = &entries[0];
        assert_eq!(action, AUDIT_ACTION_BULK_IMPORT);
        assert_eq!(*entity_type, EntityType::Owner);
        assert_eq!(entity_id, &result.import_id);
        assert_eq!(user_id.as_deref(), Some("u-42"));
    }

    #[tokio::test]
    async fn test_audit_written_for_failed_validation() {
        let store = Arc::new(InMemoryEntityStore::new());
        let audit = Arc::new(RecordingAuditSink::default());
        let records = vec![RawRecord::from_pairs(2, &[("name", "")])];

        let result = orchestrator(store)
            .with_audit(audit.clone())
            .import_records(EntityType::Owner, records, ImportOptions::default())
            .await
            .unwrap();

        assert_eq!(result.status, ImportStatus::Failed);
        assert_eq!(audit.entries.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_fail_import() {
        let store = Arc::new(InMemoryEntityStore::new());
        let result = orchestrator(store.clone())
            .with_audit(Arc::new(FailingAuditSink))
            .import_records(EntityType::Owner, owners(&["A", "B"]), ImportOptions::default())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.status, ImportStatus::Completed);
        assert_eq!(store.count(EntityType::Owner), 2);
    }

    #[test]
    fn test_unknown_sheet_name() {
        let sheets = vec![SheetRecords {
            name: "Parkings".to_string(),
            records: owners(&["A"]),
        }];
        assert!(matches!(
            sheets_to_phases(sheets),
            Err(ImportError::UnknownEntityType(name)) if name == "Parkings"
        ));
    }
}
