// ==========================================
// 物业批量导入系统 - 进度跟踪器
// ==========================================
// 职责: 导入作业登记表（import_id → ImportProgress）
// 规则:
// - progress_percentage = round(processed / total * 100)
// - PROCESSING 且 processed > 0 时估算剩余时间
// - processed_rows 只增不减
// - 终态后的更新一律忽略（超时后迟到的批次结果不得覆盖 TIMEOUT）
// - 终态后延迟清理,供轮询方读取最终状态
// 约束: 锁不跨 await 持有; 观察者在锁外回调
// ==========================================

use crate::domain::{ClassifiedError, ImportProgress, ImportStatus};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

// ==========================================
// ProgressUpdate - 增量更新
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ProgressUpdate {
    pub processed_rows: Option<usize>,
    pub successful_rows: Option<usize>,
    pub failed_rows: Option<usize>,
    pub status: Option<ImportStatus>,
    pub errors: Vec<ClassifiedError>, // 追加
}

impl ProgressUpdate {
    pub fn status(status: ImportStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn counts(processed: usize, successful: usize, failed: usize) -> Self {
        Self {
            processed_rows: Some(processed),
            successful_rows: Some(successful),
            failed_rows: Some(failed),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: ImportStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_errors(mut self, errors: Vec<ClassifiedError>) -> Self {
        self.errors = errors;
        self
    }
}

// ==========================================
// ProgressObserver - 进度观察者
// ==========================================
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: &ImportProgress);
}

/// 以日志输出进度
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl ProgressObserver for LoggingObserver {
    fn on_progress(&self, progress: &ImportProgress) {
        tracing::debug!(
            import_id = %progress.import_id,
            status = %progress.status,
            processed = progress.processed_rows,
            total = progress.total_rows,
            percentage = progress.progress_percentage,
            eta_ms = progress.estimated_remaining_ms,
            "导入进度"
        );
    }
}

struct JobState {
    progress: ImportProgress,
    started: Instant,
}

// ==========================================
// ProgressTracker
// ==========================================
#[derive(Clone)]
pub struct ProgressTracker {
    jobs: Arc<Mutex<HashMap<String, JobState>>>,
    observers: Arc<Mutex<Vec<Arc<dyn ProgressObserver>>>>,
    cleanup_delay: Duration,
}

impl ProgressTracker {
    pub fn new(cleanup_delay: Duration) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            observers: Arc::new(Mutex::new(Vec::new())),
            cleanup_delay,
        }
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<String, JobState>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 注册观察者
    pub fn subscribe(&self, observer: Arc<dyn ProgressObserver>) {
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(observer);
    }

    fn notify(&self, snapshot: &ImportProgress) {
        let observers: Vec<Arc<dyn ProgressObserver>> = self
            .observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        for observer in observers {
            observer.on_progress(snapshot);
        }
    }

    /// 登记新作业（PENDING）
    ///
    /// # 返回
    /// import_id
    pub fn create(&self, total_rows: usize) -> String {
        let import_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let progress = ImportProgress {
            import_id: import_id.clone(),
            total_rows,
            processed_rows: 0,
            successful_rows: 0,
            failed_rows: 0,
            progress_percentage: 0,
            status: ImportStatus::Pending,
            errors: Vec::new(),
            started_at: now,
            last_updated_at: now,
            estimated_remaining_ms: None,
        };

        self.jobs().insert(
            import_id.clone(),
            JobState {
                progress: progress.clone(),
                started: Instant::now(),
            },
        );
        tracing::debug!(import_id = %import_id, total_rows, "导入作业已登记");
        self.notify(&progress);
        import_id
    }

    /// 应用增量更新
    ///
    /// # 返回
    /// - Some(snapshot): 更新已应用
    /// - None: 作业不存在或已处于终态
    pub fn update(&self, import_id: &str, update: ProgressUpdate) -> Option<ImportProgress> {
        let snapshot = {
            let mut jobs = self.jobs();
            let job = jobs.get_mut(import_id)?;
            let progress = &mut job.progress;

            if progress.status.is_terminal() {
                tracing::debug!(
                    import_id,
                    status = %progress.status,
                    "作业已终态,忽略更新"
                );
                return None;
            }

            if let Some(processed) = update.processed_rows {
                progress.processed_rows = progress.processed_rows.max(processed.min(progress.total_rows));
            }
            if let Some(successful) = update.successful_rows {
                progress.successful_rows = successful;
            }
            if let Some(failed) = update.failed_rows {
                progress.failed_rows = failed;
            }
            if let Some(status) = update.status {
                progress.status = status;
            }
            progress.errors.extend(update.errors);
            progress.last_updated_at = Utc::now();

            progress.progress_percentage = percentage(progress.processed_rows, progress.total_rows);
            progress.estimated_remaining_ms = if progress.status == ImportStatus::Processing
                && progress.processed_rows > 0
            {
                let elapsed_ms = job.started.elapsed().as_millis() as f64;
                let remaining = (progress.total_rows - progress.processed_rows) as f64;
                Some((elapsed_ms / progress.processed_rows as f64 * remaining).round() as u64)
            } else {
                None
            };

            progress.clone()
        };

        self.notify(&snapshot);
        Some(snapshot)
    }

    /// 读取作业快照
    pub fn get(&self, import_id: &str) -> Option<ImportProgress> {
        self.jobs().get(import_id).map(|job| job.progress.clone())
    }

    /// 立即移除作业
    pub fn cleanup(&self, import_id: &str) -> bool {
        let removed = self.jobs().remove(import_id).is_some();
        if removed {
            tracing::debug!(import_id, "导入作业已清理");
        }
        removed
    }

    /// 延迟清理（默认 60 秒）
    pub fn schedule_cleanup(&self, import_id: &str) -> JoinHandle<()> {
        let tracker = self.clone();
        let import_id = import_id.to_string();
        let delay = self.cleanup_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracker.cleanup(&import_id);
        })
    }

    /// 当前登记的作业数
    pub fn active_jobs(&self) -> usize {
        self.jobs().len()
    }

    pub fn cleanup_delay(&self) -> Duration {
        self.cleanup_delay
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

fn percentage(processed: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    ((processed as f64 / total as f64) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::error_classifier;

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(3, 3), 100);
        assert_eq!(percentage(0, 0), 100);
    }

    #[tokio::test]
    async fn test_processed_rows_never_decrease() {
        let tracker = ProgressTracker::default();
        let id = tracker.create(10);
        tracker.update(&id, ProgressUpdate::status(ImportStatus::Processing));

        tracker.update(&id, ProgressUpdate::counts(6, 6, 0));
        let snapshot = tracker.update(&id, ProgressUpdate::counts(4, 4, 0)).unwrap();

        assert_eq!(snapshot.processed_rows, 6);
        assert_eq!(snapshot.progress_percentage, 60);
        assert!(snapshot.estimated_remaining_ms.is_some());
    }

    #[tokio::test]
    async fn test_eta_only_while_processing() {
        let tracker = ProgressTracker::default();
        let id = tracker.create(4);

        let pending = tracker.update(&id, ProgressUpdate::counts(1, 1, 0)).unwrap();
        assert_eq!(pending.estimated_remaining_ms, None);

        let done = tracker
            .update(
                &id,
                ProgressUpdate::counts(4, 4, 0).with_status(ImportStatus::Completed),
            )
            .unwrap();
        assert_eq!(done.estimated_remaining_ms, None);
        assert_eq!(done.progress_percentage, 100);
    }

    #[tokio::test]
    async fn test_terminal_state_ignores_late_updates() {
        let tracker = ProgressTracker::default();
        let id = tracker.create(5);
        tracker.update(
            &id,
            ProgressUpdate::status(ImportStatus::Timeout).with_errors(vec![
                error_classifier::timeout(Duration::from_secs(2), Duration::from_secs(1)),
            ]),
        );

        let late = tracker.update(
            &id,
            ProgressUpdate::counts(5, 5, 0).with_status(ImportStatus::Completed),
        );

        assert!(late.is_none());
        let snapshot = tracker.get(&id).unwrap();
        assert_eq!(snapshot.status, ImportStatus::Timeout);
        assert_eq!(snapshot.processed_rows, 0);
        assert_eq!(snapshot.errors.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_cleanup_removes_job_after_delay() {
        let tracker = ProgressTracker::new(Duration::from_secs(60));
        let id = tracker.create(1);
        tracker.update(&id, ProgressUpdate::status(ImportStatus::Completed));

        let handle = tracker.schedule_cleanup(&id);
        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(tracker.get(&id).is_some());

        handle.await.unwrap();
        assert!(tracker.get(&id).is_none());
        assert_eq!(tracker.active_jobs(), 0);
    }

    #[tokio::test]
    async fn test_observers_receive_updates() {
        struct Counter(Mutex<Vec<u32>>);
        impl ProgressObserver for Counter {
            fn on_progress(&self, progress: &ImportProgress) {
                self.0.lock().unwrap().push(progress.progress_percentage);
            }
        }

        let tracker = ProgressTracker::default();
        let counter = Arc::new(Counter(Mutex::new(Vec::new())));
        tracker.subscribe(counter.clone());

        let id = tracker.create(2);
        tracker.update(&id, ProgressUpdate::counts(1, 1, 0));
        tracker.update(&id, ProgressUpdate::counts(2, 2, 0));

        assert_eq!(*counter.0.lock().unwrap(), vec![0, 50, 100]);
    }
}
