// ==========================================
// 物业批量导入系统 - API 层错误类型
// ==========================================
// 职责: 将导入层/存储层/配置层错误转换为调用方可读的错误消息
// ==========================================

use crate::config::ConfigError;
use crate::importer::ImportError;
use crate::repository::StoreError;
use thiserror::Error;

/// API 层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 请求错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("文件过大: {size} 字节,上限 {limit} 字节")]
    PayloadTooLarge { size: u64, limit: u64 },

    // ==========================================
    // 配置 / 数据访问错误
    // ==========================================
    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::FileNotFound(path) => ApiError::NotFound(format!("文件不存在: {}", path)),
            ImportError::UnsupportedFormat(ext) => {
                ApiError::InvalidInput(format!("不支持的文件格式: {}", ext))
            }
            ImportError::FileTooLarge { size, limit } => ApiError::PayloadTooLarge { size, limit },
            ImportError::UnknownEntityType(name) => {
                ApiError::InvalidInput(format!("无法识别的实体类型: {}", name))
            }
            ImportError::Store(e) => ApiError::from(e),
            ImportError::Config(e) => ApiError::from(e),
            ImportError::InternalError(msg) => ApiError::InternalError(msg),
            ImportError::Other(e) => ApiError::Other(e),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, key } => {
                ApiError::NotFound(format!("{}(key={})不存在", entity, key))
            }
            StoreError::InternalError(msg) => ApiError::InternalError(msg),
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_error_mapping() {
        let err: ApiError = ImportError::FileTooLarge { size: 20, limit: 10 }.into();
        assert!(matches!(err, ApiError::PayloadTooLarge { size: 20, limit: 10 }));

        let err: ApiError = ImportError::UnknownEntityType("Parkings".into()).into();
        assert!(matches!(err, ApiError::InvalidInput(msg) if msg.contains("Parkings")));
    }

    #[test]
    fn test_store_error_mapping() {
        let err: ApiError = StoreError::LockError("poisoned".into()).into();
        assert!(matches!(err, ApiError::DatabaseError(_)));
    }
}
