// ==========================================
// 物业批量导入系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 优先级: config_kv(global) > 环境变量 > 默认值
// ==========================================

use crate::config::import_config::{config_keys, ConfigError, ImportConfig};
use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// 全局作用域
pub const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, ConfigError> {
        let conn = open_sqlite_connection(db_path).map_err(|e| read_error("<open>", e))?;
        init_schema(&conn).map_err(|e| read_error("<schema>", e))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, ConfigError> {
        {
            let guard = lock(&conn)?;
            configure_sqlite_connection(&guard).map_err(|e| read_error("<pragma>", e))?;
        }
        Ok(Self { conn })
    }

    fn get_conn(&self) -> Result<MutexGuard<'_, Connection>, ConfigError> {
        lock(&self.conn)
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let conn = self.get_conn()?;
        conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![GLOBAL_SCOPE, key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| read_error(key, e))
    }

    /// 写入 global scope 的配置值（UPSERT）
    ///
    /// 写入前按 ImportConfig 规则校验,非法值直接拒绝
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        ImportConfig::default().apply(key, value)?;

        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = ?4",
            params![GLOBAL_SCOPE, key, value, Utc::now().to_rfc3339()],
        )
        .map_err(|e| read_error(key, e))?;

        tracing::info!(key, value, "配置已更新");
        Ok(())
    }

    /// global scope 全部配置（键 → 值）
    pub fn get_config_snapshot(&self) -> Result<HashMap<String, String>, ConfigError> {
        let conn = self.get_conn()?;
        let mut stmt = conn
            .prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")
            .map_err(|e| read_error("<snapshot>", e))?;

        let rows = stmt
            .query_map(params![GLOBAL_SCOPE], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| read_error("<snapshot>", e))?;

        let mut map = HashMap::new();
        for row in rows {
            let (key, value) = row.map_err(|e| read_error("<snapshot>", e))?;
            map.insert(key, value);
        }
        Ok(map)
    }

    /// 加载导入配置: 默认值 → 环境变量 → config_kv
    pub fn load_import_config(&self) -> Result<ImportConfig, ConfigError> {
        let mut config = ImportConfig::from_env()?;
        let stored = self.get_config_snapshot()?;
        config.overlay(|key| stored.get(key).cloned())?;

        tracing::debug!(
            batch_size = config.batch_size,
            timeout_ms = config.timeout_ms,
            parallel = config.enable_parallel_processing,
            overrides = stored
                .keys()
                .filter(|k| config_keys::ALL.contains(&k.as_str()))
                .count(),
            "导入配置已加载"
        );
        Ok(config)
    }
}

fn lock(conn: &Arc<Mutex<Connection>>) -> Result<MutexGuard<'_, Connection>, ConfigError> {
    conn.lock().map_err(|e| ConfigError::ReadError {
        key: "<lock>".to_string(),
        message: format!("锁获取失败: {}", e),
    })
}

fn read_error(key: &str, e: impl std::fmt::Display) -> ConfigError {
    ConfigError::ReadError {
        key: key.to_string(),
        message: e.to_string(),
    }
}
