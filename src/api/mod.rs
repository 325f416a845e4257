// ==========================================
// 物业批量导入系统 - API 层
// ==========================================
// 职责: 对外业务接口（上传导入 / 进度查询 / 模板下载）
// ==========================================

pub mod error;
pub mod import_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use import_api::ImportApi;
