// ==========================================
// 物业批量导入系统 - 核心库
// ==========================================
// 职责: 表格上传 → 校验 → 按依赖顺序批量创建 业主/楼栋/租户/单元
// 技术栈: Rust + Tokio + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与导入过程类型
pub mod domain;

// 数据仓储层 - 实体存储与审计
pub mod repository;

// 导入层 - 解析 / 校验 / 批量创建 / 进度
pub mod importer;

// 配置层 - 导入配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 性能埋点
pub mod perf;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

pub use api::{ApiError, ImportApi};
pub use config::{ConfigManager, ImportConfig};
pub use domain::{
    ClassifiedError, Entity, EntityType, ErrorType, ImportProgress, ImportResult, ImportStatus,
    RawRecord, Severity,
};
pub use importer::{ImportError, ImportOptions, ImportOrchestrator, ProgressTracker, ValidationPolicy};
pub use repository::{EntityStore, InMemoryEntityStore, SqliteEntityStore, StoreError};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "物业批量导入系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
