// ==========================================
// 物业批量导入系统 - 存储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约束码供错误分类器使用（唯一约束 / 外键 / 未找到 ...）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ==========================================
// ConstraintCode - 存储层约束码
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintCode {
    Unique,     // 唯一约束 / 主键冲突
    ForeignKey, // 外键约束
    NotFound,   // 引用记录不存在
    NotNull,    // 非空约束
    Check,      // CHECK 约束
    Other,      // 其他约束
}

impl ConstraintCode {
    /// 对外暴露的错误码
    pub fn as_code(&self) -> &'static str {
        match self {
            ConstraintCode::Unique => "STORE_UNIQUE_VIOLATION",
            ConstraintCode::ForeignKey => "STORE_FOREIGN_KEY_VIOLATION",
            ConstraintCode::NotFound => "STORE_RECORD_NOT_FOUND",
            ConstraintCode::NotNull => "STORE_NOT_NULL_VIOLATION",
            ConstraintCode::Check => "STORE_CHECK_VIOLATION",
            ConstraintCode::Other => "STORE_CONSTRAINT_VIOLATION",
        }
    }
}

impl fmt::Display for ConstraintCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_code())
    }
}

/// 存储层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    // ===== 约束错误 =====
    #[error("约束违反 ({code}): {message}")]
    Constraint { code: ConstraintCode, message: String },

    #[error("记录未找到: {entity} key={key}")]
    NotFound { entity: String, key: String },

    // ===== 数据库错误 =====
    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库繁忙,操作超时: {0}")]
    Busy(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl StoreError {
    pub fn unique(message: impl Into<String>) -> Self {
        StoreError::Constraint {
            code: ConstraintCode::Unique,
            message: message.into(),
        }
    }

    pub fn foreign_key(message: impl Into<String>) -> Self {
        StoreError::Constraint {
            code: ConstraintCode::ForeignKey,
            message: message.into(),
        }
    }

    /// 存储层约束码（若有）
    pub fn constraint_code(&self) -> Option<ConstraintCode> {
        match self {
            StoreError::Constraint { code, .. } => Some(*code),
            StoreError::NotFound { .. } => Some(ConstraintCode::NotFound),
            _ => None,
        }
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ffi;

        match err {
            rusqlite::Error::SqliteFailure(e, msg) => {
                let message = msg.unwrap_or_else(|| e.to_string());
                let code = match e.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        Some(ConstraintCode::Unique)
                    }
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(ConstraintCode::ForeignKey),
                    ffi::SQLITE_CONSTRAINT_NOTNULL => Some(ConstraintCode::NotNull),
                    ffi::SQLITE_CONSTRAINT_CHECK => Some(ConstraintCode::Check),
                    _ if e.code == rusqlite::ErrorCode::ConstraintViolation => {
                        Some(ConstraintCode::Other)
                    }
                    _ => None,
                };

                match code {
                    Some(code) => StoreError::Constraint { code, message },
                    None if matches!(
                        e.code,
                        rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                    ) =>
                    {
                        StoreError::Busy(message)
                    }
                    None => StoreError::DatabaseQueryError(message),
                }
            }
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound {
                entity: "Unknown".to_string(),
                key: "Unknown".to_string(),
            },
            _ => StoreError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_unique_violation_maps_to_unique_code() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();

        let err = conn.execute("INSERT INTO t VALUES ('a')", []).unwrap_err();
        let store_err = StoreError::from(err);

        assert_eq!(store_err.constraint_code(), Some(ConstraintCode::Unique));
    }

    #[test]
    fn test_foreign_key_violation_maps_to_foreign_key_code() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE p (id TEXT PRIMARY KEY);
             CREATE TABLE c (pid TEXT REFERENCES p(id));",
        )
        .unwrap();

        let err = conn.execute("INSERT INTO c VALUES ('missing')", []).unwrap_err();

        assert_eq!(
            StoreError::from(err).constraint_code(),
            Some(ConstraintCode::ForeignKey)
        );
    }

    #[test]
    fn test_not_found_has_code() {
        let err = StoreError::from(rusqlite::Error::QueryReturnedNoRows);
        assert_eq!(err.constraint_code(), Some(ConstraintCode::NotFound));
        assert_eq!(StoreError::Busy("x".into()).constraint_code(), None);
    }
}
