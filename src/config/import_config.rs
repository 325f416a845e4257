// ==========================================
// 物业批量导入系统 - 导入配置
// ==========================================
// 来源优先级: config_kv 表 > 环境变量 (ESTATE_IMPORT_*) > 默认值
// 红线: 仅配置读取与校验,不包含业务逻辑
// ==========================================

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },

    #[error("配置读取失败 (key: {key}): {message}")]
    ReadError { key: String, message: String },
}

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    pub const TIMEOUT_MS: &str = "import/timeout_ms";
    pub const BATCH_SIZE: &str = "import/batch_size";
    pub const CACHE_SIZE: &str = "import/cache_size";
    pub const CACHE_TTL_MS: &str = "import/cache_ttl_ms";
    pub const ENABLE_PARALLEL_PROCESSING: &str = "import/enable_parallel_processing";
    pub const PARALLEL_THRESHOLD: &str = "import/parallel_threshold";
    pub const MAX_CONCURRENCY: &str = "import/max_concurrency";
    pub const MAX_FILE_SIZE: &str = "import/max_file_size";
    pub const CLEANUP_DELAY_MS: &str = "import/cleanup_delay_ms";

    pub const ALL: [&str; 9] = [
        TIMEOUT_MS,
        BATCH_SIZE,
        CACHE_SIZE,
        CACHE_TTL_MS,
        ENABLE_PARALLEL_PROCESSING,
        PARALLEL_THRESHOLD,
        MAX_CONCURRENCY,
        MAX_FILE_SIZE,
        CLEANUP_DELAY_MS,
    ];

    /// 配置键对应的环境变量名: import/batch_size → ESTATE_IMPORT_BATCH_SIZE
    pub fn env_var_name(key: &str) -> String {
        let suffix = key.trim_start_matches("import/");
        format!("ESTATE_IMPORT_{}", suffix.to_uppercase())
    }
}

// ==========================================
// ImportConfig
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// 全局超时（毫秒）,默认 30 分钟
    pub timeout_ms: u64,
    /// 批次大小,默认 100
    pub batch_size: usize,
    /// 每种实体的缓存容量,默认 1000
    pub cache_size: usize,
    /// 缓存条目 TTL（毫秒）,默认 5 分钟
    pub cache_ttl_ms: u64,
    /// 是否启用批内并行,默认关闭
    pub enable_parallel_processing: bool,
    /// 批内行数超过该阈值才并行,默认 10
    pub parallel_threshold: usize,
    /// 批内最大并发行数,默认 8
    pub max_concurrency: usize,
    /// 上传文件大小上限（字节）,默认 10 MB
    pub max_file_size: u64,
    /// 终态后进度记录保留时长（毫秒）,默认 60 秒
    pub cleanup_delay_ms: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30 * 60 * 1000,
            batch_size: 100,
            cache_size: 1000,
            cache_ttl_ms: 5 * 60 * 1000,
            enable_parallel_processing: false,
            parallel_threshold: 10,
            max_concurrency: 8,
            max_file_size: 10 * 1024 * 1024,
            cleanup_delay_ms: 60 * 1000,
        }
    }
}

fn is_true(v: &str) -> Option<bool> {
    match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
        message: "无法解析为非负整数".to_string(),
    })
}

impl ImportConfig {
    /// 从环境变量读取（缺失项使用默认值）
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(config_keys::env_var_name(key)).ok())
    }

    /// 从任意键值来源读取（键为 config_keys 中的配置键）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.overlay(lookup)?;
        Ok(config)
    }

    /// 用来源中存在的值覆盖当前配置
    pub fn overlay<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in config_keys::ALL {
            if let Some(raw) = lookup(key) {
                self.apply(key, &raw)?;
            }
        }
        self.validate()
    }

    /// 设置单个配置项
    pub fn apply(&mut self, key: &str, raw: &str) -> Result<(), ConfigError> {
        use config_keys::*;

        match key {
            TIMEOUT_MS => self.timeout_ms = parse_num(key, raw)?,
            BATCH_SIZE => self.batch_size = parse_num(key, raw)?,
            CACHE_SIZE => self.cache_size = parse_num(key, raw)?,
            CACHE_TTL_MS => self.cache_ttl_ms = parse_num(key, raw)?,
            ENABLE_PARALLEL_PROCESSING => {
                self.enable_parallel_processing =
                    is_true(raw).ok_or_else(|| ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: raw.to_string(),
                        message: "期望布尔值 (true/false/1/0)".to_string(),
                    })?
            }
            PARALLEL_THRESHOLD => self.parallel_threshold = parse_num(key, raw)?,
            MAX_CONCURRENCY => self.max_concurrency = parse_num(key, raw)?,
            MAX_FILE_SIZE => self.max_file_size = parse_num(key, raw)?,
            CLEANUP_DELAY_MS => self.cleanup_delay_ms = parse_num(key, raw)?,
            other => {
                return Err(ConfigError::InvalidValue {
                    key: other.to_string(),
                    value: raw.to_string(),
                    message: "未知配置键".to_string(),
                })
            }
        }
        Ok(())
    }

    /// 校验取值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            (config_keys::BATCH_SIZE, self.batch_size),
            (config_keys::CACHE_SIZE, self.cache_size),
            (config_keys::MAX_CONCURRENCY, self.max_concurrency),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    message: "必须大于 0".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn cleanup_delay(&self) -> Duration {
        Duration::from_millis(self.cleanup_delay_ms)
    }
}
