// ==========================================
// 物业批量导入系统 - 领域类型定义
// ==========================================
// 职责: 严重级别 / 错误分类 / 任务状态 / 实体类型
// 序列化格式: SCREAMING_SNAKE_CASE (与上传结果 JSON 一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 严重级别 (Severity)
// ==========================================
// ERROR: 行无效 / 行失败
// WARNING: 仅提示,不影响行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

// ==========================================
// 错误分类 (Error Type)
// ==========================================
// 红线: DUPLICATE 一律为 WARNING,其余默认 ERROR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    Validation, // 校验失败（未访问存储）
    Duplicate,  // 自然键已存在
    Constraint, // 存储拒绝写入（非重复原因）
    Reference,  // 引用实体无法解析
    System,     // 未分类
    Timeout,    // 全局超时
}

impl ErrorType {
    /// 该分类的默认严重级别
    pub fn default_severity(&self) -> Severity {
        match self {
            ErrorType::Duplicate => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorType::Validation => write!(f, "VALIDATION"),
            ErrorType::Duplicate => write!(f, "DUPLICATE"),
            ErrorType::Constraint => write!(f, "CONSTRAINT"),
            ErrorType::Reference => write!(f, "REFERENCE"),
            ErrorType::System => write!(f, "SYSTEM"),
            ErrorType::Timeout => write!(f, "TIMEOUT"),
        }
    }
}

// ==========================================
// 导入任务状态 (Import Status)
// ==========================================
// 状态机: PENDING → PROCESSING → {COMPLETED | FAILED | TIMEOUT}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Timeout,
}

impl ImportStatus {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ImportStatus::Completed | ImportStatus::Failed | ImportStatus::Timeout
        )
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportStatus::Pending => write!(f, "PENDING"),
            ImportStatus::Processing => write!(f, "PROCESSING"),
            ImportStatus::Completed => write!(f, "COMPLETED"),
            ImportStatus::Failed => write!(f, "FAILED"),
            ImportStatus::Timeout => write!(f, "TIMEOUT"),
        }
    }
}

// ==========================================
// 实体类型 (Entity Type)
// ==========================================
// 依赖顺序: 业主 → 楼栋 → 租户 → 单元
// 后序类型只通过实体缓存解析前序类型的引用
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Owner,
    Building,
    Tenant,
    Unit,
}

impl EntityType {
    /// 全部实体类型（按依赖顺序）
    pub const ALL: [EntityType; 4] = [
        EntityType::Owner,
        EntityType::Building,
        EntityType::Tenant,
        EntityType::Unit,
    ];

    /// 依赖序号（越小越先导入）
    pub fn dependency_rank(&self) -> u8 {
        match self {
            EntityType::Owner => 0,
            EntityType::Building => 1,
            EntityType::Tenant => 2,
            EntityType::Unit => 3,
        }
    }

    /// 自然键字段名
    pub fn natural_key_field(&self) -> &'static str {
        match self {
            EntityType::Owner | EntityType::Building | EntityType::Tenant => "name",
            EntityType::Unit => "number",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Owner => "owner",
            EntityType::Building => "building",
            EntityType::Tenant => "tenant",
            EntityType::Unit => "unit",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    /// 支持工作表名 / 命令行参数别名（单复数、中英法）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "owner" | "owners" | "proprietaire" | "proprietaires" | "propriétaire"
            | "propriétaires" | "业主" => Ok(EntityType::Owner),
            "building" | "buildings" | "immeuble" | "immeubles" | "楼栋" => {
                Ok(EntityType::Building)
            }
            "tenant" | "tenants" | "locataire" | "locataires" | "租户" => Ok(EntityType::Tenant),
            "unit" | "units" | "lot" | "lots" | "单元" => Ok(EntityType::Unit),
            other => Err(format!("未知实体类型: {}", other)),
        }
    }
}
