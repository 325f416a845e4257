// ==========================================
// 物业批量导入系统 - 字段映射器实现
// ==========================================
// 职责: 源列名 → 标准字段映射 + 类型转换（RawRecord → EntityRow）
// 规则:
// - 列名支持中 / 英 / 法别名（大小写不敏感）
// - 数值无法解析 → ERROR 问题,字段置空
// - 枚举取值未知 → WARNING 问题,降级为默认值
// ==========================================

use crate::domain::{
    BuildingRow, BuildingType, EntityRow, EntityType, OwnerRow, PartyType, RawRecord, TenantRow,
    UnitRow, UnitStatus, UnitType, ValidationIssue,
};

// ==========================================
// 列名别名表（首项为标准列名）
// ==========================================
const NAME: &[&str] = &["name", "nom", "名称"];
const EMAIL: &[&str] = &["email", "e-mail", "courriel", "邮箱"];
const PHONE: &[&str] = &["phone", "telephone", "téléphone", "tel", "电话"];
const ADDRESS: &[&str] = &["address", "adresse", "地址"];
const OWNER_TYPE: &[&str] = &["owner_type", "type", "业主类型"];
const BUILDING_NAME_SELF: &[&str] = &["name", "building_name", "nom", "immeuble", "楼栋名称"];
const OWNER_NAME: &[&str] = &["owner_name", "owner", "proprietaire", "propriétaire", "业主"];
const FLOORS: &[&str] = &["floors", "etages", "étages", "楼层数"];
const YEAR_BUILT: &[&str] = &["year_built", "annee_construction", "année_construction", "建成年份"];
const BUILDING_TYPE: &[&str] = &["building_type", "type", "楼栋类型"];
const TENANT_TYPE: &[&str] = &["tenant_type", "type", "租户类型"];
const NUMBER: &[&str] = &["number", "unit_number", "numero", "numéro", "lot", "单元号"];
const BUILDING_REF: &[&str] = &["building_name", "building", "immeuble", "楼栋"];
const UNIT_TYPE: &[&str] = &["unit_type", "type", "单元类型"];
const FLOOR: &[&str] = &["floor", "etage", "étage", "楼层"];
const AREA: &[&str] = &["area_m2", "area", "surface", "面积"];
const RENT: &[&str] = &["monthly_rent", "rent", "loyer", "月租金"];
const TENANT_REF: &[&str] = &["tenant_name", "tenant", "locataire", "租户"];
const STATUS: &[&str] = &["status", "statut", "状态"];

/// 各实体类型的标准列（模板 / 文档使用）
pub fn canonical_columns(entity_type: EntityType) -> &'static [&'static str] {
    match entity_type {
        EntityType::Owner => &["name", "email", "phone", "address", "owner_type"],
        EntityType::Building => &[
            "name",
            "address",
            "owner_name",
            "floors",
            "year_built",
            "building_type",
        ],
        EntityType::Tenant => &["name", "email", "phone", "tenant_type"],
        EntityType::Unit => &[
            "number",
            "building_name",
            "unit_type",
            "floor",
            "area_m2",
            "monthly_rent",
            "tenant_name",
            "status",
        ],
    }
}

/// 映射结果: 类型化行 + 映射阶段发现的问题
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRow {
    pub row: EntityRow,
    pub issues: Vec<ValidationIssue>,
}

// ==========================================
// FieldMapper
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldMapper;

struct MapContext<'a> {
    record: &'a RawRecord,
    issues: Vec<ValidationIssue>,
}

impl<'a> MapContext<'a> {
    fn new(record: &'a RawRecord) -> Self {
        Self {
            record,
            issues: Vec::new(),
        }
    }

    fn position(&self) -> usize {
        self.record.source_position()
    }

    fn string(&self, aliases: &[&str]) -> Option<String> {
        self.record.get_any(aliases).map(str::to_string)
    }

    /// 解析整数（兼容 Excel 的 "3.0" 形式）
    fn int(&mut self, aliases: &[&str]) -> Option<i32> {
        let record = self.record;
        let raw = record.get_any(aliases)?;
        let parsed = raw.parse::<i32>().ok().or_else(|| {
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.fract() == 0.0 && v.abs() <= i32::MAX as f64)
                .map(|v| v as i32)
        });

        if parsed.is_none() {
            let position = self.position();
            self.issues.push(ValidationIssue::error(
                position,
                aliases[0],
                Some(raw),
                format!("无法解析为整数: {}", raw),
            ));
        }
        parsed
    }

    /// 解析浮点数（兼容小数逗号）
    fn float(&mut self, aliases: &[&str]) -> Option<f64> {
        let record = self.record;
        let raw = record.get_any(aliases)?;
        let parsed = raw
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite());

        if parsed.is_none() {
            let position = self.position();
            self.issues.push(ValidationIssue::error(
                position,
                aliases[0],
                Some(raw),
                format!("无法解析为数值: {}", raw),
            ));
        }
        parsed
    }

    /// 解析枚举; 未知值降级为默认值并记 WARNING
    fn enumeration<T: Default + Copy + std::fmt::Display>(
        &mut self,
        aliases: &[&str],
        allowed: &[&str],
        parse: fn(&str) -> Option<T>,
        fallback: T,
    ) -> T {
        let record = self.record;
        let Some(raw) = record.get_any(aliases) else {
            return fallback;
        };
        match parse(raw) {
            Some(v) => v,
            None => {
                let position = self.position();
                self.issues.push(ValidationIssue::warning(
                    position,
                    aliases[0],
                    Some(raw),
                    format!(
                        "取值未知,允许值: {},已使用默认值 {}",
                        allowed.join("/"),
                        fallback
                    ),
                ));
                fallback
            }
        }
    }
}

impl FieldMapper {
    /// 将原始记录映射为指定实体类型的类型化行
    pub fn map(&self, record: &RawRecord, entity_type: EntityType) -> MappedRow {
        let mut ctx = MapContext::new(record);
        let position = ctx.position();

        let row = match entity_type {
            EntityType::Owner => EntityRow::Owner(OwnerRow {
                position,
                name: ctx.string(NAME),
                email: ctx.string(EMAIL),
                phone: ctx.string(PHONE),
                address: ctx.string(ADDRESS),
                owner_type: ctx.enumeration(
                    OWNER_TYPE,
                    PartyType::ALLOWED,
                    PartyType::parse,
                    PartyType::default(),
                ),
            }),
            EntityType::Building => EntityRow::Building(BuildingRow {
                position,
                name: ctx.string(BUILDING_NAME_SELF),
                address: ctx.string(ADDRESS),
                owner_name: ctx.string(OWNER_NAME),
                floors: ctx.int(FLOORS),
                year_built: ctx.int(YEAR_BUILT),
                building_type: ctx.enumeration(
                    BUILDING_TYPE,
                    BuildingType::ALLOWED,
                    BuildingType::parse,
                    BuildingType::default(),
                ),
            }),
            EntityType::Tenant => EntityRow::Tenant(TenantRow {
                position,
                name: ctx.string(NAME),
                email: ctx.string(EMAIL),
                phone: ctx.string(PHONE),
                tenant_type: ctx.enumeration(
                    TENANT_TYPE,
                    PartyType::ALLOWED,
                    PartyType::parse,
                    PartyType::default(),
                ),
            }),
            EntityType::Unit => {
                let tenant_name = ctx.string(TENANT_REF);
                // 未填写状态时,有租户视为已出租
                let default_status = if tenant_name.is_some() {
                    UnitStatus::Occupied
                } else {
                    UnitStatus::Vacant
                };
                EntityRow::Unit(UnitRow {
                    position,
                    number: ctx.string(NUMBER),
                    building_name: ctx.string(BUILDING_REF),
                    unit_type: ctx.enumeration(
                        UNIT_TYPE,
                        UnitType::ALLOWED,
                        UnitType::parse,
                        UnitType::default(),
                    ),
                    floor: ctx.int(FLOOR),
                    area_m2: ctx.float(AREA),
                    monthly_rent: ctx.float(RENT),
                    tenant_name,
                    status: ctx.enumeration(
                        STATUS,
                        UnitStatus::ALLOWED,
                        UnitStatus::parse,
                        default_status,
                    ),
                })
            }
        };

        MappedRow {
            row,
            issues: ctx.issues,
        }
    }
}
