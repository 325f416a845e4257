// ==========================================
// 物业批量导入系统 - 导入过程领域模型
// ==========================================
// 校验问题 / 分类错误 / 批次结果 / 进度 / 导入结果
// ==========================================

use crate::domain::types::{ErrorType, ImportStatus, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ValidationIssue - 校验问题
// ==========================================
// ERROR 使所属行无效; WARNING 仅提示
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub position: usize,
    pub field: String,
    pub value: Option<String>,
    pub message: String,
    pub severity: Severity,
}

impl ValidationIssue {
    pub fn error(position: usize, field: &str, value: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            position,
            field: field.to_string(),
            value: value.map(|v| v.to_string()),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(position: usize, field: &str, value: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            position,
            field: field.to_string(),
            value: value.map(|v| v.to_string()),
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

// ==========================================
// ClassifiedError - 分类错误
// ==========================================
// 红线: error_type = DUPLICATE ⇒ severity = WARNING
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub position: usize,
    pub field: String,
    pub value: Option<String>,
    pub message: String,
    pub severity: Severity,
    pub error_type: ErrorType,
    pub code: String,
}

impl ClassifiedError {
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Error
    }
}

// ==========================================
// BatchResult - 批次处理结果
// ==========================================
// 每行恰好计入 成功 或 失败 之一:
// - 成功: 已创建 / 判定为重复（实体已存在,仅产生 WARNING）
// - 失败: 产生 ERROR 级分类错误
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub successful_rows: usize,
    pub processed_rows: usize,
    pub duplicate_rows: usize,
    pub created_rows: usize,
    pub errors: Vec<ClassifiedError>,
}

impl BatchResult {
    pub fn failed_rows(&self) -> usize {
        self.processed_rows - self.successful_rows
    }

    /// 累加另一个批次结果
    pub fn merge(&mut self, other: BatchResult) {
        self.successful_rows += other.successful_rows;
        self.processed_rows += other.processed_rows;
        self.duplicate_rows += other.duplicate_rows;
        self.created_rows += other.created_rows;
        self.errors.extend(other.errors);
    }
}

// ==========================================
// ImportProgress - 导入进度
// ==========================================
// 仅由 ProgressTracker 修改; 终态后延迟清理
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportProgress {
    pub import_id: String,
    pub total_rows: usize,
    pub processed_rows: usize,
    pub successful_rows: usize,
    pub failed_rows: usize,
    pub progress_percentage: u32,
    pub status: ImportStatus,
    pub errors: Vec<ClassifiedError>,
    pub started_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_remaining_ms: Option<u64>,
}

// ==========================================
// ImportResult - 导入结果
// ==========================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorStatistics {
    pub critical_errors: usize,
    pub warnings: usize,
    pub duplicates: usize,
    pub validation_errors: usize,
}

impl ErrorStatistics {
    pub fn from_errors(errors: &[ClassifiedError]) -> Self {
        let mut stats = ErrorStatistics::default();
        for e in errors {
            match e.severity {
                Severity::Error => stats.critical_errors += 1,
                Severity::Warning => stats.warnings += 1,
            }
            if e.error_type == ErrorType::Duplicate {
                stats.duplicates += 1;
            }
            if e.error_type == ErrorType::Validation && e.severity == Severity::Error {
                stats.validation_errors += 1;
            }
        }
        stats
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub avg_ms_per_row: f64,
    pub transaction_count: usize, // 实际成功创建的实体数
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub success: bool, // critical_errors == 0
    pub total_rows: usize,
    pub successful_rows: usize,
    pub failed_rows: usize,
    pub errors: Vec<ClassifiedError>,
    pub summary: String,
    pub processing_time_ms: u64,
    pub import_id: String,
    pub status: ImportStatus,
    pub error_statistics: ErrorStatistics,
    pub performance_metrics: PerformanceMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classified(error_type: ErrorType, severity: Severity) -> ClassifiedError {
        ClassifiedError {
            position: 2,
            field: "name".to_string(),
            value: None,
            message: "x".to_string(),
            severity,
            error_type,
            code: "X".to_string(),
        }
    }

    #[test]
    fn test_error_statistics() {
        let errors = vec![
            classified(ErrorType::Duplicate, Severity::Warning),
            classified(ErrorType::Validation, Severity::Error),
            classified(ErrorType::Validation, Severity::Warning),
            classified(ErrorType::Reference, Severity::Error),
        ];
        let stats = ErrorStatistics::from_errors(&errors);

        assert_eq!(stats.critical_errors, 2);
        assert_eq!(stats.warnings, 2);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.validation_errors, 1);
    }

    #[test]
    fn test_batch_result_merge() {
        let mut total = BatchResult::default();
        total.merge(BatchResult {
            successful_rows: 3,
            processed_rows: 4,
            duplicate_rows: 1,
            created_rows: 2,
            errors: vec![classified(ErrorType::Reference, Severity::Error)],
        });
        total.merge(BatchResult {
            successful_rows: 2,
            processed_rows: 2,
            duplicate_rows: 0,
            created_rows: 2,
            errors: vec![],
        });

        assert_eq!(total.processed_rows, 6);
        assert_eq!(total.successful_rows, 5);
        assert_eq!(total.failed_rows(), 1);
        assert_eq!(total.created_rows, 4);
        assert_eq!(total.errors.len(), 1);
    }
}
