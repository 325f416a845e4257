// ==========================================
// 物业批量导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ImportError: 作业级错误（文件 / 格式 / 配置 / 存储）
// RowError:    单行创建失败,交由错误分类器处理
// ==========================================

use crate::config::ConfigError;
use crate::domain::EntityType;
use crate::repository::StoreError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件过大: {size} 字节,上限 {limit} 字节")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("输入内容无效: {0}")]
    MalformedInput(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 业务错误 =====
    #[error("未知实体类型: {0}")]
    UnknownEntityType(String),

    // ===== 依赖层错误 =====
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

impl From<calamine::XlsxError> for ImportError {
    fn from(err: calamine::XlsxError) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

impl From<calamine::XlsError> for ImportError {
    fn from(err: calamine::XlsError) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

// ==========================================
// RowError - 单行创建失败
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    /// 自然键已存在（缓存或存储中）
    #[error("{field} 已存在: {key}")]
    Duplicate { field: String, key: String },

    /// 引用的实体无法解析
    #[error("引用的{entity_type}不存在: {key}")]
    Reference {
        field: String,
        entity_type: EntityType,
        key: String,
    },

    /// 处理阶段发现的数据问题（如缺失自然键）
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("operation timed out")]
    Timeout,

    #[error("{0}")]
    System(String),
}

impl RowError {
    /// 出错字段（无法确定时返回 None）
    pub fn field(&self) -> Option<&str> {
        match self {
            RowError::Duplicate { field, .. }
            | RowError::Reference { field, .. }
            | RowError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    /// 出错值
    pub fn value(&self) -> Option<&str> {
        match self {
            RowError::Duplicate { key, .. } | RowError::Reference { key, .. } => Some(key),
            _ => None,
        }
    }
}
