// ==========================================
// 物业批量导入系统 - 配置层
// ==========================================
// 职责: 导入配置管理,支持多级覆写
// 存储: config_kv 表 + 环境变量
// ==========================================

pub mod config_manager;
pub mod import_config;

// 重导出核心配置
pub use config_manager::{ConfigManager, GLOBAL_SCOPE};
pub use import_config::{config_keys, ConfigError, ImportConfig};
