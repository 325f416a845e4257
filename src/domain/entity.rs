// ==========================================
// 物业批量导入系统 - 实体领域模型
// ==========================================
// 职责: 业主 / 楼栋 / 租户 / 单元 实体及其枚举属性
// 用途: 导入层写入,存储层持久化
// ==========================================

use crate::domain::types::EntityType;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 枚举属性
// ==========================================
// 未知取值由字段映射降级为默认值（见 field_mapper）

/// 业主 / 租户类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartyType {
    #[default]
    Individual,
    Company,
}

impl PartyType {
    pub const ALLOWED: &'static [&'static str] = &["INDIVIDUAL", "COMPANY"];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "INDIVIDUAL" | "PERSON" | "PARTICULIER" => Some(PartyType::Individual),
            "COMPANY" | "SOCIETE" | "SOCIÉTÉ" | "ENTREPRISE" => Some(PartyType::Company),
            _ => None,
        }
    }
}

/// 楼栋类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildingType {
    #[default]
    Residential,
    Commercial,
    Mixed,
    Industrial,
}

impl BuildingType {
    pub const ALLOWED: &'static [&'static str] =
        &["RESIDENTIAL", "COMMERCIAL", "MIXED", "INDUSTRIAL"];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "RESIDENTIAL" | "RESIDENTIEL" => Some(BuildingType::Residential),
            "COMMERCIAL" => Some(BuildingType::Commercial),
            "MIXED" | "MIXTE" => Some(BuildingType::Mixed),
            "INDUSTRIAL" | "INDUSTRIEL" => Some(BuildingType::Industrial),
            _ => None,
        }
    }
}

/// 单元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitType {
    #[default]
    Apartment,
    Office,
    Retail,
    Parking,
    Storage,
}

impl UnitType {
    pub const ALLOWED: &'static [&'static str] =
        &["APARTMENT", "OFFICE", "RETAIL", "PARKING", "STORAGE"];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "APARTMENT" | "APPARTEMENT" => Some(UnitType::Apartment),
            "OFFICE" | "BUREAU" => Some(UnitType::Office),
            "RETAIL" | "COMMERCE" => Some(UnitType::Retail),
            "PARKING" => Some(UnitType::Parking),
            "STORAGE" | "CAVE" => Some(UnitType::Storage),
            _ => None,
        }
    }
}

/// 单元状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitStatus {
    #[default]
    Vacant,
    Occupied,
    Maintenance,
}

impl UnitStatus {
    pub const ALLOWED: &'static [&'static str] = &["VACANT", "OCCUPIED", "MAINTENANCE"];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "VACANT" | "LIBRE" => Some(UnitStatus::Vacant),
            "OCCUPIED" | "OCCUPE" | "OCCUPÉ" => Some(UnitStatus::Occupied),
            "MAINTENANCE" | "TRAVAUX" => Some(UnitStatus::Maintenance),
            _ => None,
        }
    }
}

macro_rules! impl_upper_display {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let s = serde_json::to_value(self)
                    .ok()
                    .and_then(|v| v.as_str().map(|s| s.to_string()))
                    .unwrap_or_default();
                write!(f, "{}", s)
            }
        }
    };
}

impl_upper_display!(PartyType);
impl_upper_display!(BuildingType);
impl_upper_display!(UnitType);
impl_upper_display!(UnitStatus);

// ==========================================
// 已持久化实体
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    pub id: String,
    pub name: String, // 自然键
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub owner_type: PartyType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: String,
    pub name: String, // 自然键
    pub address: String,
    pub owner_id: String,
    pub floors: Option<i32>,
    pub year_built: Option<i32>,
    pub building_type: BuildingType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String, // 自然键
    pub email: Option<String>,
    pub phone: Option<String>,
    pub tenant_type: PartyType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub building_id: String,
    pub number: String, // 自然键（楼栋内唯一）
    pub unit_type: UnitType,
    pub floor: Option<i32>,
    pub area_m2: Option<f64>,
    pub monthly_rent: Option<f64>,
    pub tenant_id: Option<String>,
    pub status: UnitStatus,
}

/// 任意已持久化实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity_type", rename_all = "snake_case")]
pub enum Entity {
    Owner(Owner),
    Building(Building),
    Tenant(Tenant),
    Unit(Unit),
}

impl Entity {
    pub fn id(&self) -> &str {
        match self {
            Entity::Owner(o) => &o.id,
            Entity::Building(b) => &b.id,
            Entity::Tenant(t) => &t.id,
            Entity::Unit(u) => &u.id,
        }
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            Entity::Owner(_) => EntityType::Owner,
            Entity::Building(_) => EntityType::Building,
            Entity::Tenant(_) => EntityType::Tenant,
            Entity::Unit(_) => EntityType::Unit,
        }
    }
}

// ==========================================
// 待创建实体（无 ID,引用已解析为 ID）
// ==========================================

#[derive(Debug, Clone, PartialEq)]
pub struct NewOwner {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub owner_type: PartyType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBuilding {
    pub name: String,
    pub address: String,
    pub owner_id: String,
    pub floors: Option<i32>,
    pub year_built: Option<i32>,
    pub building_type: BuildingType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTenant {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub tenant_type: PartyType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUnit {
    pub building_id: String,
    pub number: String,
    pub unit_type: UnitType,
    pub floor: Option<i32>,
    pub area_m2: Option<f64>,
    pub monthly_rent: Option<f64>,
    pub tenant_id: Option<String>,
    pub status: UnitStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NewEntity {
    Owner(NewOwner),
    Building(NewBuilding),
    Tenant(NewTenant),
    Unit(NewUnit),
}

impl NewEntity {
    pub fn entity_type(&self) -> EntityType {
        match self {
            NewEntity::Owner(_) => EntityType::Owner,
            NewEntity::Building(_) => EntityType::Building,
            NewEntity::Tenant(_) => EntityType::Tenant,
            NewEntity::Unit(_) => EntityType::Unit,
        }
    }

    /// 存储层使用的自然键
    ///
    /// 单元在楼栋内唯一,自然键为 `building_id/number`
    pub fn natural_key(&self) -> String {
        match self {
            NewEntity::Owner(o) => o.name.clone(),
            NewEntity::Building(b) => b.name.clone(),
            NewEntity::Tenant(t) => t.name.clone(),
            NewEntity::Unit(u) => unit_natural_key(&u.building_id, &u.number),
        }
    }
}

/// 单元自然键: `<楼栋ID>/<单元号>`
pub fn unit_natural_key(building_id: &str, number: &str) -> String {
    format!("{}/{}", building_id, number.trim())
}
