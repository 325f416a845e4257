// ==========================================
// 物业批量导入系统 - 错误分类器
// ==========================================
// 职责: 行级失败 → ClassifiedError（类型 / 严重级别 / 错误码）
// 判定顺序:
// 1. 类型化行错误直接映射; 存储约束码映射
//    (唯一约束 → DUPLICATE, 外键 / 未找到 → REFERENCE, 其他 → CONSTRAINT)
// 2. 消息关键字（VALIDATION → TIMEOUT → DUPLICATE）
// 3. SYSTEM
// 红线: 纯函数,不做 I/O,不 panic; DUPLICATE 恒为 WARNING
// ==========================================

use crate::domain::{ClassifiedError, ErrorType, Severity, ValidationIssue};
use crate::importer::error::RowError;
use crate::repository::{ConstraintCode, StoreError};
use std::time::Duration;

const VALIDATION_KEYWORDS: &[&str] = &["validation", "invalid", "required", "校验", "无效", "必填"];
const TIMEOUT_KEYWORDS: &[&str] = &["timeout", "timed out", "超时"];
const DUPLICATE_KEYWORDS: &[&str] = &["duplicate", "already exists", "unique", "已存在", "重复"];

/// 错误类型的标准错误码
pub fn canonical_code(error_type: ErrorType) -> &'static str {
    match error_type {
        ErrorType::Validation => "VALIDATION_ERROR",
        ErrorType::Duplicate => "DUPLICATE_ENTRY",
        ErrorType::Constraint => "CONSTRAINT_VIOLATION",
        ErrorType::Reference => "REFERENCE_NOT_FOUND",
        ErrorType::System => "SYSTEM_ERROR",
        ErrorType::Timeout => "IMPORT_TIMEOUT",
    }
}

fn constraint_type(code: ConstraintCode) -> ErrorType {
    match code {
        ConstraintCode::Unique => ErrorType::Duplicate,
        ConstraintCode::ForeignKey | ConstraintCode::NotFound => ErrorType::Reference,
        ConstraintCode::NotNull | ConstraintCode::Check | ConstraintCode::Other => {
            ErrorType::Constraint
        }
    }
}

/// 按消息关键字判定（大小写不敏感）
pub fn classify_message(message: &str) -> ErrorType {
    let lower = message.to_lowercase();
    let hit = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    if hit(VALIDATION_KEYWORDS) {
        ErrorType::Validation
    } else if hit(TIMEOUT_KEYWORDS) {
        ErrorType::Timeout
    } else if hit(DUPLICATE_KEYWORDS) {
        ErrorType::Duplicate
    } else {
        ErrorType::System
    }
}

fn build(
    error_type: ErrorType,
    code: &str,
    position: usize,
    field: &str,
    value: Option<&str>,
    message: String,
) -> ClassifiedError {
    ClassifiedError {
        position,
        field: field.to_string(),
        value: value.map(str::to_string),
        message,
        severity: error_type.default_severity(),
        error_type,
        code: code.to_string(),
    }
}

/// 分类一条行级失败
///
/// # 参数
/// - error: 行级失败
/// - position: 行号
/// - field / value: 出错字段与取值（None 时取自错误本身）
pub fn classify(
    error: &RowError,
    position: usize,
    field: Option<&str>,
    value: Option<&str>,
) -> ClassifiedError {
    let field = field.or_else(|| error.field()).unwrap_or("row");
    let value = value.or_else(|| error.value());
    let message = error.to_string();

    let (error_type, code) = match error {
        RowError::Duplicate { .. } => (ErrorType::Duplicate, None),
        RowError::Reference { .. } => (ErrorType::Reference, None),
        RowError::Validation { .. } => (ErrorType::Validation, None),
        RowError::Timeout => (ErrorType::Timeout, None),
        RowError::Store(store) => match store.constraint_code() {
            Some(code) => (constraint_type(code), Some(code.as_code())),
            None => (classify_message(&message), None),
        },
        RowError::System(msg) => (classify_message(msg), None),
    };

    let code = code.unwrap_or_else(|| canonical_code(error_type));
    build(error_type, code, position, field, value, message)
}

/// 分类存储层错误
pub fn classify_store_error(
    error: &StoreError,
    position: usize,
    field: Option<&str>,
    value: Option<&str>,
) -> ClassifiedError {
    classify(&RowError::Store(error.clone()), position, field, value)
}

/// 校验问题 → 分类错误（保持原严重级别）
pub fn from_issue(issue: &ValidationIssue) -> ClassifiedError {
    let code = match issue.severity {
        Severity::Error => "VALIDATION_ERROR",
        Severity::Warning => "VALIDATION_WARNING",
    };
    ClassifiedError {
        position: issue.position,
        field: issue.field.clone(),
        value: issue.value.clone(),
        message: issue.message.clone(),
        severity: issue.severity,
        error_type: ErrorType::Validation,
        code: code.to_string(),
    }
}

/// 作业级超时错误
pub fn timeout(elapsed: Duration, limit: Duration) -> ClassifiedError {
    build(
        ErrorType::Timeout,
        canonical_code(ErrorType::Timeout),
        0,
        "import",
        None,
        format!(
            "import timed out after {} ms (limit {} ms)",
            elapsed.as_millis(),
            limit.as_millis()
        ),
    )
}
