// ==========================================
// 物业批量导入系统 - 内存实体存储
// ==========================================
// 用途: 试运行（--dry-run）与测试
// 行为与 SQLite 实现保持一致:
// - 自然键大小写不敏感且唯一
// - 楼栋/单元的引用 ID 必须已存在（外键语义）
// 附加: 查询/创建计数、可选延迟、按自然键注入失败
// ==========================================

use crate::domain::{
    unit_natural_key, Building, Entity, EntityType, NewEntity, Owner, Tenant, Unit,
};
use crate::repository::entity_store::EntityStore;
use crate::repository::error::StoreError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryEntityStore {
    entities: Mutex<HashMap<(EntityType, String), Entity>>,
    ids: Mutex<HashSet<String>>,
    failures: Mutex<HashMap<String, StoreError>>,
    latency: Option<Duration>,
    lookup_count: AtomicUsize,
    create_count: AtomicUsize,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次存储调用前等待固定时长（模拟慢存储）
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// 创建指定自然键的实体时返回给定错误
    pub fn fail_on_create(&self, natural_key: &str, error: StoreError) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(normalize(natural_key), error);
        }
    }

    /// find_by_natural_key 调用次数
    pub fn lookup_count(&self) -> usize {
        self.lookup_count.load(Ordering::SeqCst)
    }

    /// create 调用次数（含失败）
    pub fn create_count(&self) -> usize {
        self.create_count.load(Ordering::SeqCst)
    }

    /// 某类实体的已存数量
    pub fn count(&self, entity_type: EntityType) -> usize {
        self.entities
            .lock()
            .map(|m| m.keys().filter(|(t, _)| *t == entity_type).count())
            .unwrap_or(0)
    }

    /// 按自然键直接读取（不计入查询次数）
    pub fn get(&self, entity_type: EntityType, key: &str) -> Option<Entity> {
        self.entities
            .lock()
            .ok()
            .and_then(|m| m.get(&(entity_type, normalize(key))).cloned())
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn require_id(ids: &HashSet<String>, id: &str, what: &str) -> Result<(), StoreError> {
        if ids.contains(id) {
            Ok(())
        } else {
            Err(StoreError::foreign_key(format!("{} 不存在: {}", what, id)))
        }
    }
}

/// 与 SQLite `COLLATE NOCASE` 相同: 只折叠 ASCII 大小写
fn normalize(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn find_by_natural_key(
        &self,
        entity_type: EntityType,
        key: &str,
    ) -> Result<Option<Entity>, StoreError> {
        self.lookup_count.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        let entities = self
            .entities
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))?;
        Ok(entities.get(&(entity_type, normalize(key))).cloned())
    }

    async fn create(&self, entity: NewEntity) -> Result<Entity, StoreError> {
        self.create_count.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        let entity_type = entity.entity_type();
        let key = normalize(&entity.natural_key());

        if let Some(err) = self
            .failures
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))?
            .get(&key)
            .cloned()
        {
            return Err(err);
        }

        let mut entities = self
            .entities
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))?;
        let mut ids = self
            .ids
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))?;

        if entities.contains_key(&(entity_type, key.clone())) {
            return Err(StoreError::unique(format!(
                "UNIQUE constraint failed: {}.{}",
                entity_type,
                entity_type.natural_key_field()
            )));
        }

        let id = Uuid::new_v4().to_string();
        let created = match entity {
            NewEntity::Owner(o) => Entity::Owner(Owner {
                id: id.clone(),
                name: o.name,
                email: o.email,
                phone: o.phone,
                address: o.address,
                owner_type: o.owner_type,
            }),
            NewEntity::Building(b) => {
                Self::require_id(&ids, &b.owner_id, "业主")?;
                Entity::Building(Building {
                    id: id.clone(),
                    name: b.name,
                    address: b.address,
                    owner_id: b.owner_id,
                    floors: b.floors,
                    year_built: b.year_built,
                    building_type: b.building_type,
                })
            }
            NewEntity::Tenant(t) => Entity::Tenant(Tenant {
                id: id.clone(),
                name: t.name,
                email: t.email,
                phone: t.phone,
                tenant_type: t.tenant_type,
            }),
            NewEntity::Unit(u) => {
                Self::require_id(&ids, &u.building_id, "楼栋")?;
                if let Some(tenant_id) = &u.tenant_id {
                    Self::require_id(&ids, tenant_id, "租户")?;
                }
                Entity::Unit(Unit {
                    id: id.clone(),
                    building_id: u.building_id,
                    number: u.number,
                    unit_type: u.unit_type,
                    floor: u.floor,
                    area_m2: u.area_m2,
                    monthly_rent: u.monthly_rent,
                    tenant_id: u.tenant_id,
                    status: u.status,
                })
            }
        };

        ids.insert(id);
        entities.insert((entity_type, key), created.clone());
        Ok(created)
    }
}
