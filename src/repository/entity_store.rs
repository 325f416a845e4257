// ==========================================
// 物业批量导入系统 - 实体存储 Trait
// ==========================================
// 职责: 定义导入所需的存储访问接口（不包含业务逻辑）
// 红线: Repository 不含业务规则,只做按自然键查询与创建
// ==========================================

use crate::domain::{Entity, EntityType, NewEntity};
use crate::repository::error::StoreError;
use async_trait::async_trait;

// ==========================================
// EntityStore Trait
// ==========================================
// 实现者: SqliteEntityStore（rusqlite）, InMemoryEntityStore（试运行 / 测试）
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// 按自然键查询实体
    ///
    /// # 参数
    /// - entity_type: 实体类型
    /// - key: 自然键（业主/楼栋/租户为名称,单元为 `楼栋ID/单元号`）
    ///
    /// # 返回
    /// - Ok(Some(entity)): 找到
    /// - Ok(None): 不存在
    /// - Err: 存储错误
    async fn find_by_natural_key(
        &self,
        entity_type: EntityType,
        key: &str,
    ) -> Result<Option<Entity>, StoreError>;

    /// 创建实体
    ///
    /// # 返回
    /// - Ok(entity): 已持久化的实体（含生成的 ID）
    /// - Err(StoreError::Constraint): 唯一约束 / 外键 / CHECK 违反
    async fn create(&self, entity: NewEntity) -> Result<Entity, StoreError>;
}
