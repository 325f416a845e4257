// ==========================================
// 物业批量导入系统 - 导入 API
// ==========================================
// 职责: 封装上传导入 / 进度查询 / 模板下载,字符串参数在此解析
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::{EntityType, ImportProgress, ImportResult};
use crate::importer::{template_for, ImportOptions, ImportOrchestrator, ProgressTracker};
use crate::repository::{SqliteAuditSink, SqliteEntityStore};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// 导入 API
pub struct ImportApi {
    orchestrator: ImportOrchestrator,
}

impl ImportApi {
    pub fn new(orchestrator: ImportOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// 以 SQLite 数据库为后端创建（实体 / 配置 / 审计共用一个连接）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn open(db_path: &str) -> ApiResult<Self> {
        let store = SqliteEntityStore::new(db_path)?;
        let conn = store.connection();
        let config = ConfigManager::from_connection(Arc::clone(&conn))?.load_import_config()?;
        info!(db_path, ?config, "导入 API 初始化");

        let tracker = ProgressTracker::new(config.cleanup_delay());
        let orchestrator = ImportOrchestrator::new(config, Arc::new(store))
            .with_tracker(tracker)
            .with_audit(Arc::new(SqliteAuditSink::new(conn)));
        Ok(Self::new(orchestrator))
    }

    pub fn orchestrator(&self) -> &ImportOrchestrator {
        &self.orchestrator
    }

    /// 导入文件
    ///
    /// # 参数
    /// - file_path: 文件路径
    /// - entity_type: 实体类型（None 时按工作表名识别）
    /// - user_id: 操作人（可选）
    ///
    /// # 返回
    /// - Ok(ImportResult): 导入结果（含校验失败 / 超时等终态）
    /// - Err(ApiError): 文件或参数错误,作业未启动
    pub async fn import_file(
        &self,
        file_path: &str,
        entity_type: Option<&str>,
        user_id: Option<&str>,
    ) -> ApiResult<ImportResult> {
        if file_path.trim().is_empty() {
            return Err(ApiError::InvalidInput("文件路径不能为空".to_string()));
        }
        if !Path::new(file_path).exists() {
            return Err(ApiError::NotFound(format!("文件不存在: {}", file_path)));
        }

        let entity_type = entity_type.map(parse_entity_type).transpose()?;
        let options = options_for(user_id);
        Ok(self
            .orchestrator
            .import_file(file_path, entity_type, options)
            .await?)
    }

    /// 导入上传内容（文件名只用于判断格式）
    pub async fn import_upload(
        &self,
        bytes: &[u8],
        file_name: &str,
        entity_type: &str,
        user_id: Option<&str>,
    ) -> ApiResult<ImportResult> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ApiError::InvalidInput(format!("文件名缺少扩展名: {}", file_name)))?;
        let entity_type = parse_entity_type(entity_type)?;

        Ok(self
            .orchestrator
            .import_bytes(bytes, ext, entity_type, options_for(user_id))
            .await?)
    }

    /// 查询导入进度（终态后保留一段时间,清理后返回 NotFound）
    pub fn get_progress(&self, import_id: &str) -> ApiResult<ImportProgress> {
        self.orchestrator
            .tracker()
            .get(import_id)
            .ok_or_else(|| ApiError::NotFound(format!("导入作业(id={})不存在", import_id)))
    }

    /// 下载模板（CSV 文本）
    pub fn template(&self, entity_type: &str) -> ApiResult<String> {
        let entity_type = parse_entity_type(entity_type)?;
        Ok(template_for(entity_type).to_csv()?)
    }
}

fn parse_entity_type(raw: &str) -> ApiResult<EntityType> {
    raw.parse::<EntityType>().map_err(ApiError::InvalidInput)
}

fn options_for(user_id: Option<&str>) -> ImportOptions {
    ImportOptions {
        user_id: user_id.map(str::to_string),
        ..ImportOptions::default()
    }
}
