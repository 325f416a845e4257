// ==========================================
// 物业批量导入系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供存储访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod audit_repo;
pub mod entity_store;
pub mod error;
pub mod in_memory_entity_store;
pub mod sqlite_entity_store;

// 重导出核心仓储
pub use audit_repo::{AuditEntry, AuditSink, SqliteAuditSink, TracingAuditSink};
pub use entity_store::EntityStore;
pub use error::{ConstraintCode, StoreError, StoreResult};
pub use in_memory_entity_store::InMemoryEntityStore;
pub use sqlite_entity_store::SqliteEntityStore;
