// ==========================================
// 物业批量导入系统 - 导入审计日志
// ==========================================
// 红线: 审计写入失败不得导致导入失败（调用方等待写入完成,错误只记日志）
// 实现者: SqliteAuditSink（import_audit_log 表）, TracingAuditSink（仅日志）
// ==========================================

use crate::domain::EntityType;
use crate::repository::error::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// 审计记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub audit_id: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub summary: String,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ==========================================
// AuditSink Trait
// ==========================================
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// 记录一条审计
    ///
    /// # 参数
    /// - action: 操作（如 BULK_IMPORT）
    /// - entity_type: 实体类型
    /// - entity_id: 实体 ID（批量导入时为 import_id）
    /// - summary: 摘要
    /// - user_id: 操作人（可选）
    async fn record(
        &self,
        action: &str,
        entity_type: EntityType,
        entity_id: &str,
        summary: &str,
        user_id: Option<&str>,
    ) -> Result<(), StoreError>;
}

// ==========================================
// SqliteAuditSink
// ==========================================
pub struct SqliteAuditSink {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAuditSink {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))
    }

    /// 查询最近的审计记录（按时间倒序）
    pub fn list_recent(&self, limit: usize) -> StoreResult<Vec<AuditEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT audit_id, action, entity_type, entity_id, summary, user_id, created_at
             FROM import_audit_log ORDER BY created_at DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            let created_at: String = row.get(6)?;
            Ok(AuditEntry {
                audit_id: row.get(0)?,
                action: row.get(1)?,
                entity_type: row.get(2)?,
                entity_id: row.get(3)?,
                summary: row.get(4)?,
                user_id: row.get(5)?,
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}

#[async_trait]
impl AuditSink for SqliteAuditSink {
    async fn record(
        &self,
        action: &str,
        entity_type: EntityType,
        entity_id: &str,
        summary: &str,
        user_id: Option<&str>,
    ) -> Result<(), StoreError> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO import_audit_log (audit_id, action, entity_type, entity_id, summary,
                                           user_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                Uuid::new_v4().to_string(),
                action,
                entity_type.as_str(),
                entity_id,
                summary,
                user_id,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

// ==========================================
// TracingAuditSink
// ==========================================
/// 仅输出日志的审计实现（无数据库场景）
#[derive(Debug, Clone, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(
        &self,
        action: &str,
        entity_type: EntityType,
        entity_id: &str,
        summary: &str,
        user_id: Option<&str>,
    ) -> Result<(), StoreError> {
        tracing::info!(
            target: "audit",
            action,
            entity_type = %entity_type,
            entity_id,
            user_id = user_id.unwrap_or("system"),
            summary,
            "audit"
        );
        Ok(())
    }
}
