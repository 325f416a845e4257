// ==========================================
// 物业批量导入系统 - 行创建
// ==========================================
// 职责: 类型化行 → 存储创建调用（缓存优先）
// 流程（每行）:
// 1. 自然键查缓存（未命中查存储）→ 已存在则 Duplicate
// 2. 引用字段经前序类型的缓存解析 → 解析失败则 Reference
// 3. 调用存储创建,成功后写入缓存
// ==========================================

use crate::domain::{
    unit_natural_key, BuildingRow, Entity, EntityRow, EntityType, NewBuilding, NewEntity,
    NewOwner, NewTenant, NewUnit, OwnerRow, TenantRow, UnitRow,
};
use crate::importer::entity_cache::EntityCaches;
use crate::importer::error::RowError;
use crate::repository::{EntityStore, StoreError};
use std::sync::Arc;

/// 行创建上下文（整个作业共享）
#[derive(Clone)]
pub struct CreationContext {
    pub store: Arc<dyn EntityStore>,
    pub caches: Arc<EntityCaches>,
}

impl CreationContext {
    pub fn new(store: Arc<dyn EntityStore>, caches: Arc<EntityCaches>) -> Self {
        Self { store, caches }
    }

    /// 经缓存解析自然键
    async fn resolve(
        &self,
        entity_type: EntityType,
        key: &str,
    ) -> Result<Option<Entity>, StoreError> {
        let store = &self.store;
        self.caches
            .for_type(entity_type)
            .resolve(key, |k| async move { store.find_by_natural_key(entity_type, &k).await })
            .await
    }

    /// 解析必需的引用,不存在时返回 Reference
    async fn resolve_reference(
        &self,
        entity_type: EntityType,
        field: &str,
        key: &str,
    ) -> Result<Entity, RowError> {
        self.resolve(entity_type, key)
            .await?
            .ok_or_else(|| RowError::Reference {
                field: field.to_string(),
                entity_type,
                key: key.to_string(),
            })
    }

    /// 自然键已存在时返回 Duplicate
    async fn ensure_absent(
        &self,
        entity_type: EntityType,
        field: &str,
        key: &str,
        display_key: &str,
    ) -> Result<(), RowError> {
        match self.resolve(entity_type, key).await? {
            Some(_) => Err(RowError::Duplicate {
                field: field.to_string(),
                key: display_key.to_string(),
            }),
            None => Ok(()),
        }
    }

    async fn create_and_cache(&self, key: &str, entity: NewEntity) -> Result<Entity, RowError> {
        let entity_type = entity.entity_type();
        let created = self.store.create(entity).await?;
        self.caches.for_type(entity_type).store(key, created.clone());
        Ok(created)
    }
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, RowError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| RowError::Validation {
            field: field.to_string(),
            message: format!("{} is required", field),
        })
}

pub async fn create_owner(row: &OwnerRow, ctx: &CreationContext) -> Result<Entity, RowError> {
    let name = required(&row.name, "name")?;
    ctx.ensure_absent(EntityType::Owner, "name", name, name).await?;

    ctx.create_and_cache(
        name,
        NewEntity::Owner(NewOwner {
            name: name.to_string(),
            email: row.email.clone(),
            phone: row.phone.clone(),
            address: row.address.clone(),
            owner_type: row.owner_type,
        }),
    )
    .await
}

pub async fn create_building(row: &BuildingRow, ctx: &CreationContext) -> Result<Entity, RowError> {
    let name = required(&row.name, "name")?;
    let address = required(&row.address, "address")?;
    let owner_name = required(&row.owner_name, "owner_name")?;

    ctx.ensure_absent(EntityType::Building, "name", name, name).await?;
    let owner = ctx
        .resolve_reference(EntityType::Owner, "owner_name", owner_name)
        .await?;

    ctx.create_and_cache(
        name,
        NewEntity::Building(NewBuilding {
            name: name.to_string(),
            address: address.to_string(),
            owner_id: owner.id().to_string(),
            floors: row.floors,
            year_built: row.year_built,
            building_type: row.building_type,
        }),
    )
    .await
}

pub async fn create_tenant(row: &TenantRow, ctx: &CreationContext) -> Result<Entity, RowError> {
    let name = required(&row.name, "name")?;
    ctx.ensure_absent(EntityType::Tenant, "name", name, name).await?;

    ctx.create_and_cache(
        name,
        NewEntity::Tenant(NewTenant {
            name: name.to_string(),
            email: row.email.clone(),
            phone: row.phone.clone(),
            tenant_type: row.tenant_type,
        }),
    )
    .await
}

pub async fn create_unit(row: &UnitRow, ctx: &CreationContext) -> Result<Entity, RowError> {
    let number = required(&row.number, "number")?;
    let building_name = required(&row.building_name, "building_name")?;

    let building = ctx
        .resolve_reference(EntityType::Building, "building_name", building_name)
        .await?;

    // 单元号仅在楼栋内唯一
    let key = unit_natural_key(building.id(), number);
    let display_key = format!("{}/{}", building_name, number);
    ctx.ensure_absent(EntityType::Unit, "number", &key, &display_key)
        .await?;

    let tenant_id = match row.tenant_name.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(tenant_name) => Some(
            ctx.resolve_reference(EntityType::Tenant, "tenant_name", tenant_name)
                .await?
                .id()
                .to_string(),
        ),
        None => None,
    };

    ctx.create_and_cache(
        &key,
        NewEntity::Unit(NewUnit {
            building_id: building.id().to_string(),
            number: number.to_string(),
            unit_type: row.unit_type,
            floor: row.floor,
            area_m2: row.area_m2,
            monthly_rent: row.monthly_rent,
            tenant_id,
            status: row.status,
        }),
    )
    .await
}

/// 按行类型分派到对应的创建函数
pub async fn create_row(row: &EntityRow, ctx: &CreationContext) -> Result<Entity, RowError> {
    match row {
        EntityRow::Owner(r) => create_owner(r, ctx).await,
        EntityRow::Building(r) => create_building(r, ctx).await,
        EntityRow::Tenant(r) => create_tenant(r, ctx).await,
        EntityRow::Unit(r) => create_unit(r, ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BuildingType, PartyType, UnitStatus, UnitType};
    use crate::repository::InMemoryEntityStore;
    use std::time::Duration;

    fn context() -> (Arc<InMemoryEntityStore>, CreationContext) {
        let store = Arc::new(InMemoryEntityStore::new());
        let caches = Arc::new(EntityCaches::new(100, Duration::from_secs(300)));
        let ctx = CreationContext::new(store.clone(), caches);
        (store, ctx)
    }

    fn owner_row(position: usize, name: &str) -> OwnerRow {
        OwnerRow {
            position,
            name: Some(name.to_string()),
            email: None,
            phone: None,
            address: None,
            owner_type: PartyType::Individual,
        }
    }

    fn building_row(name: &str, owner: &str) -> BuildingRow {
        BuildingRow {
            position: 2,
            name: Some(name.to_string()),
            address: Some("1 rue Haute".to_string()),
            owner_name: Some(owner.to_string()),
            floors: Some(5),
            year_built: None,
            building_type: BuildingType::Residential,
        }
    }

    #[tokio::test]
    async fn test_duplicate_owner_detected_from_cache() {
        let (store, ctx) = context();
        create_owner(&owner_row(2, "Acme"), &ctx).await.unwrap();

        let err = create_owner(&owner_row(3, "ACME"), &ctx).await.unwrap_err();

        assert!(matches!(err, RowError::Duplicate { .. }));
        assert_eq!(store.create_count(), 1);
        assert_eq!(store.lookup_count(), 1);
    }

    #[tokio::test]
    async fn test_building_resolves_owner_through_cache() {
        let (store, ctx) = context();
        create_owner(&owner_row(2, "Acme"), &ctx).await.unwrap();
        let lookups_after_owner = store.lookup_count();

        create_building(&building_row("Tower A", "acme"), &ctx).await.unwrap();
        create_building(&building_row("Tower B", "Acme"), &ctx).await.unwrap();

        // 仅楼栋自身的查重查询,业主引用全部命中缓存
        assert_eq!(store.lookup_count(), lookups_after_owner + 2);
        assert_eq!(store.count(EntityType::Building), 2);
    }

    #[tokio::test]
    async fn test_unknown_owner_is_reference_error() {
        let (_store, ctx) = context();
        let err = create_building(&building_row("Tower", "Ghost"), &ctx)
            .await
            .unwrap_err();

        match err {
            RowError::Reference { field, entity_type, key } => {
                assert_eq!(field, "owner_name");
                assert_eq!(entity_type, EntityType::Owner);
                assert_eq!(key, "Ghost");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unit_with_tenant() {
        let (store, ctx) = context();
        create_owner(&owner_row(2, "Acme"), &ctx).await.unwrap();
        create_building(&building_row("Tower", "Acme"), &ctx).await.unwrap();
        create_tenant(
            &TenantRow {
                position: 2,
                name: Some("Bob".into()),
                email: None,
                phone: None,
                tenant_type: PartyType::Individual,
            },
            &ctx,
        )
        .await
        .unwrap();

        let row = UnitRow {
            position: 2,
            number: Some("A1".into()),
            building_name: Some("Tower".into()),
            unit_type: UnitType::Apartment,
            floor: Some(1),
            area_m2: Some(42.0),
            monthly_rent: Some(900.0),
            tenant_name: Some("bob".into()),
            status: UnitStatus::Occupied,
        };
        let unit = create_unit(&row, &ctx).await.unwrap();

        match unit {
            Entity::Unit(u) => assert!(u.tenant_id.is_some()),
            other => panic!("unexpected entity: {other:?}"),
        }

        let again = create_unit(&row, &ctx).await.unwrap_err();
        assert!(matches!(again, RowError::Duplicate { .. }));
        assert_eq!(store.count(EntityType::Unit), 1);
    }

    #[tokio::test]
    async fn test_missing_natural_key_is_validation() {
        let (_store, ctx) = context();
        let mut row = owner_row(2, "x");
        row.name = None;

        let err = create_owner(&row, &ctx).await.unwrap_err();
        assert!(matches!(err, RowError::Validation { .. }));
    }
}
