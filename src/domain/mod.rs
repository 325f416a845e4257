// ==========================================
// 物业批量导入系统 - 领域模型层
// ==========================================
// 职责: 定义实体、行记录、导入过程类型
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod entity;
pub mod import;
pub mod record;
pub mod types;

// 重导出核心类型
pub use entity::{
    unit_natural_key, Building, BuildingType, Entity, NewBuilding, NewEntity, NewOwner,
    NewTenant, NewUnit, Owner, PartyType, Tenant, Unit, UnitStatus, UnitType,
};
pub use import::{
    BatchResult, ClassifiedError, ErrorStatistics, ImportProgress, ImportResult,
    PerformanceMetrics, ValidationIssue,
};
pub use record::{BuildingRow, EntityRow, OwnerRow, RawRecord, TenantRow, UnitRow};
pub use types::{EntityType, ErrorType, ImportStatus, Severity};
