// ==========================================
// 物业批量导入系统 - SQLite 实体存储实现
// ==========================================
// 职责: 实现 EntityStore（使用 rusqlite）
// 红线: Repository 不含业务规则,只做数据 CRUD
// ==========================================

use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use crate::domain::{
    Building, BuildingType, Entity, EntityType, NewEntity, Owner, PartyType, Tenant, Unit,
    UnitStatus, UnitType,
};
use crate::perf::install_sqlite_profiling;
use crate::repository::entity_store::EntityStore;
use crate::repository::error::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

// ==========================================
// SqliteEntityStore
// ==========================================
pub struct SqliteEntityStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEntityStore {
    /// 打开数据库文件并初始化表结构
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> StoreResult<Self> {
        let mut conn = open_sqlite_connection(db_path)?;
        install_sqlite_profiling(&mut conn);
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 内存数据库（测试 / 试运行）
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        configure_sqlite_connection(&conn)?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（会再次应用统一 PRAGMA 与建表,幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> StoreResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| StoreError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
            init_schema(&guard)?;
        }
        Ok(Self { conn })
    }

    /// 共享连接（供审计 / 配置复用）
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn get_conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))
    }

    /// 统计某类实体数量
    pub fn count(&self, entity_type: EntityType) -> StoreResult<usize> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT COUNT(*) FROM {}", table_name(entity_type));
        let n: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(n as usize)
    }

    // ==========================================
    // 查询
    // ==========================================

    fn find_owner(conn: &Connection, name: &str) -> StoreResult<Option<Entity>> {
        let owner = conn
            .query_row(
                "SELECT owner_id, name, email, phone, address, owner_type
                 FROM owner WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Owner {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        phone: row.get(3)?,
                        address: row.get(4)?,
                        owner_type: PartyType::parse(&row.get::<_, String>(5)?)
                            .unwrap_or_default(),
                    })
                },
            )
            .optional()?;
        Ok(owner.map(Entity::Owner))
    }

    fn find_building(conn: &Connection, name: &str) -> StoreResult<Option<Entity>> {
        let building = conn
            .query_row(
                "SELECT building_id, name, address, owner_id, floors, year_built, building_type
                 FROM building WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Building {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        address: row.get(2)?,
                        owner_id: row.get(3)?,
                        floors: row.get(4)?,
                        year_built: row.get(5)?,
                        building_type: BuildingType::parse(&row.get::<_, String>(6)?)
                            .unwrap_or_default(),
                    })
                },
            )
            .optional()?;
        Ok(building.map(Entity::Building))
    }

    fn find_tenant(conn: &Connection, name: &str) -> StoreResult<Option<Entity>> {
        let tenant = conn
            .query_row(
                "SELECT tenant_id, name, email, phone, tenant_type FROM tenant WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Tenant {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        phone: row.get(3)?,
                        tenant_type: PartyType::parse(&row.get::<_, String>(4)?)
                            .unwrap_or_default(),
                    })
                },
            )
            .optional()?;
        Ok(tenant.map(Entity::Tenant))
    }

    fn find_unit(conn: &Connection, key: &str) -> StoreResult<Option<Entity>> {
        // 单元自然键: <building_id>/<number>
        let Some((building_id, number)) = key.split_once('/') else {
            return Ok(None);
        };

        let unit = conn
            .query_row(
                "SELECT unit_id, building_id, number, unit_type, floor, area_m2,
                        monthly_rent, tenant_id, status
                 FROM unit WHERE building_id = ?1 AND number = ?2 COLLATE NOCASE",
                params![building_id, number],
                |row| {
                    Ok(Unit {
                        id: row.get(0)?,
                        building_id: row.get(1)?,
                        number: row.get(2)?,
                        unit_type: UnitType::parse(&row.get::<_, String>(3)?).unwrap_or_default(),
                        floor: row.get(4)?,
                        area_m2: row.get(5)?,
                        monthly_rent: row.get(6)?,
                        tenant_id: row.get(7)?,
                        status: UnitStatus::parse(&row.get::<_, String>(8)?).unwrap_or_default(),
                    })
                },
            )
            .optional()?;
        Ok(unit.map(Entity::Unit))
    }

    // ==========================================
    // 写入
    // ==========================================

    fn insert(conn: &Connection, entity: NewEntity) -> StoreResult<Entity> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        match entity {
            NewEntity::Owner(o) => {
                conn.execute(
                    "INSERT INTO owner (owner_id, name, email, phone, address, owner_type, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![id, o.name, o.email, o.phone, o.address, o.owner_type.to_string(), now],
                )?;
                Ok(Entity::Owner(Owner {
                    id,
                    name: o.name,
                    email: o.email,
                    phone: o.phone,
                    address: o.address,
                    owner_type: o.owner_type,
                }))
            }
            NewEntity::Building(b) => {
                conn.execute(
                    "INSERT INTO building (building_id, name, address, owner_id, floors,
                                           year_built, building_type, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        id,
                        b.name,
                        b.address,
                        b.owner_id,
                        b.floors,
                        b.year_built,
                        b.building_type.to_string(),
                        now
                    ],
                )?;
                Ok(Entity::Building(Building {
                    id,
                    name: b.name,
                    address: b.address,
                    owner_id: b.owner_id,
                    floors: b.floors,
                    year_built: b.year_built,
                    building_type: b.building_type,
                }))
            }
            NewEntity::Tenant(t) => {
                conn.execute(
                    "INSERT INTO tenant (tenant_id, name, email, phone, tenant_type, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![id, t.name, t.email, t.phone, t.tenant_type.to_string(), now],
                )?;
                Ok(Entity::Tenant(Tenant {
                    id,
                    name: t.name,
                    email: t.email,
                    phone: t.phone,
                    tenant_type: t.tenant_type,
                }))
            }
            NewEntity::Unit(u) => {
                conn.execute(
                    "INSERT INTO unit (unit_id, building_id, number, unit_type, floor, area_m2,
                                       monthly_rent, tenant_id, status, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        id,
                        u.building_id,
                        u.number,
                        u.unit_type.to_string(),
                        u.floor,
                        u.area_m2,
                        u.monthly_rent,
                        u.tenant_id,
                        u.status.to_string(),
                        now
                    ],
                )?;
                Ok(Entity::Unit(Unit {
                    id,
                    building_id: u.building_id,
                    number: u.number,
                    unit_type: u.unit_type,
                    floor: u.floor,
                    area_m2: u.area_m2,
                    monthly_rent: u.monthly_rent,
                    tenant_id: u.tenant_id,
                    status: u.status,
                }))
            }
        }
    }
}

fn table_name(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Owner => "owner",
        EntityType::Building => "building",
        EntityType::Tenant => "tenant",
        EntityType::Unit => "unit",
    }
}

#[async_trait]
impl EntityStore for SqliteEntityStore {
    async fn find_by_natural_key(
        &self,
        entity_type: EntityType,
        key: &str,
    ) -> Result<Option<Entity>, StoreError> {
        let conn = self.get_conn()?;
        let key = key.trim();
        match entity_type {
            EntityType::Owner => Self::find_owner(&conn, key),
            EntityType::Building => Self::find_building(&conn, key),
            EntityType::Tenant => Self::find_tenant(&conn, key),
            EntityType::Unit => Self::find_unit(&conn, key),
        }
    }

    async fn create(&self, entity: NewEntity) -> Result<Entity, StoreError> {
        let conn = self.get_conn()?;
        Self::insert(&conn, entity)
    }
}
