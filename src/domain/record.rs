// ==========================================
// 物业批量导入系统 - 行记录模型
// ==========================================
// RawRecord: 解析器产出的原始行（列名 → 值）
// EntityRow: 字段映射后的类型化行（每种实体一个变体）
// ==========================================

use crate::domain::entity::{BuildingType, PartyType, UnitStatus, UnitType};
use crate::domain::types::EntityType;
use serde::{Deserialize, Serialize};

// ==========================================
// RawRecord - 原始行记录
// ==========================================
// 列名已 TRIM + 小写; 空单元格为 None
// source_position: 表格中的行号（表头为第 1 行）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    fields: Vec<(String, Option<String>)>,
    source_position: usize,
}

impl RawRecord {
    pub fn new(source_position: usize, fields: Vec<(String, Option<String>)>) -> Self {
        let fields = fields
            .into_iter()
            .map(|(k, v)| {
                let value = v.and_then(|s| {
                    let trimmed = s.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        Some(trimmed.to_string())
                    }
                });
                (k.trim().to_lowercase(), value)
            })
            .collect();
        Self {
            fields,
            source_position,
        }
    }

    /// 便捷构造（测试 / 模板使用）
    pub fn from_pairs(source_position: usize, pairs: &[(&str, &str)]) -> Self {
        Self::new(
            source_position,
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), Some(v.to_string())))
                .collect(),
        )
    }

    pub fn source_position(&self) -> usize {
        self.source_position
    }

    /// 按列名取值（大小写不敏感）
    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.trim().to_lowercase();
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    /// 依次尝试多个别名,返回第一个非空值
    pub fn get_any(&self, aliases: &[&str]) -> Option<&str> {
        aliases.iter().find_map(|alias| self.get(alias))
    }

    /// 是否所有值均为空
    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|(_, v)| v.is_none())
    }

    pub fn fields(&self) -> &[(String, Option<String>)] {
        &self.fields
    }
}

// ==========================================
// 类型化行
// ==========================================
// 数值字段解析失败时为 None,并由映射阶段产出 ERROR 级问题

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerRow {
    pub position: usize,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub owner_type: PartyType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingRow {
    pub position: usize,
    pub name: Option<String>,
    pub address: Option<String>,
    pub owner_name: Option<String>, // 引用: 业主自然键
    pub floors: Option<i32>,
    pub year_built: Option<i32>,
    pub building_type: BuildingType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantRow {
    pub position: usize,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub tenant_type: PartyType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRow {
    pub position: usize,
    pub number: Option<String>,
    pub building_name: Option<String>, // 引用: 楼栋自然键
    pub unit_type: UnitType,
    pub floor: Option<i32>,
    pub area_m2: Option<f64>,
    pub monthly_rent: Option<f64>,
    pub tenant_name: Option<String>, // 引用: 租户自然键（可选）
    pub status: UnitStatus,
}

/// 类型化行（每种实体一个变体）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity_type", rename_all = "snake_case")]
pub enum EntityRow {
    Owner(OwnerRow),
    Building(BuildingRow),
    Tenant(TenantRow),
    Unit(UnitRow),
}

impl EntityRow {
    pub fn entity_type(&self) -> EntityType {
        match self {
            EntityRow::Owner(_) => EntityType::Owner,
            EntityRow::Building(_) => EntityType::Building,
            EntityRow::Tenant(_) => EntityType::Tenant,
            EntityRow::Unit(_) => EntityType::Unit,
        }
    }

    pub fn position(&self) -> usize {
        match self {
            EntityRow::Owner(r) => r.position,
            EntityRow::Building(r) => r.position,
            EntityRow::Tenant(r) => r.position,
            EntityRow::Unit(r) => r.position,
        }
    }

    /// 自然键取值（用于错误定位）
    pub fn natural_key(&self) -> Option<&str> {
        match self {
            EntityRow::Owner(r) => r.name.as_deref(),
            EntityRow::Building(r) => r.name.as_deref(),
            EntityRow::Tenant(r) => r.name.as_deref(),
            EntityRow::Unit(r) => r.number.as_deref(),
        }
    }

    pub fn natural_key_field(&self) -> &'static str {
        self.entity_type().natural_key_field()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_record_normalizes_keys_and_blanks() {
        let record = RawRecord::new(
            2,
            vec![
                ("  Name ".to_string(), Some("  Alice ".to_string())),
                ("Email".to_string(), Some("   ".to_string())),
            ],
        );

        assert_eq!(record.get("name"), Some("Alice"));
        assert_eq!(record.get("NAME"), Some("Alice"));
        assert_eq!(record.get("email"), None);
        assert_eq!(record.source_position(), 2);
        assert!(!record.is_blank());
    }

    #[test]
    fn test_raw_record_get_any_prefers_first_non_empty() {
        let record = RawRecord::from_pairs(3, &[("nom", ""), ("name", "Bob")]);
        assert_eq!(record.get_any(&["nom", "name"]), Some("Bob"));
    }

    #[test]
    fn test_blank_record() {
        let record = RawRecord::from_pairs(4, &[("name", " "), ("email", "")]);
        assert!(record.is_blank());
    }
}
