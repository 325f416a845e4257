// ==========================================
// 物业批量导入系统 - 实体校验器
// ==========================================
// 阶段 1: 校验闸门
// 职责: 每种实体一套规则,输出 ValidationIssue（ERROR / WARNING）
// 约束: 确定性、无副作用、不访问存储
// 规则:
// - 身份字段（自然键 / 必填引用）缺失 → ERROR
// - 数值越界 → ERROR
// - 邮箱 / 电话格式可疑 → WARNING
// ==========================================

use crate::domain::{
    BuildingRow, EntityRow, EntityType, OwnerRow, RawRecord, TenantRow, UnitRow, ValidationIssue,
};
use crate::importer::field_mapper::{FieldMapper, MappedRow};
use chrono::Datelike;
use std::collections::HashMap;

// ==========================================
// EntityValidator Trait
// ==========================================
pub trait EntityValidator: Send + Sync {
    /// 校验一行,返回全部问题（空表示通过）
    fn validate(&self, row: &EntityRow) -> Vec<ValidationIssue>;
}

// ===== 通用规则 =====

fn require(
    issues: &mut Vec<ValidationIssue>,
    position: usize,
    field: &str,
    value: &Option<String>,
) {
    if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
        issues.push(ValidationIssue::error(
            position,
            field,
            value.as_deref(),
            format!("{} is required", field),
        ));
    }
}

fn check_int_range(
    issues: &mut Vec<ValidationIssue>,
    position: usize,
    field: &str,
    value: Option<i32>,
    min: i32,
    max: i32,
) {
    if let Some(v) = value {
        if v < min || v > max {
            issues.push(ValidationIssue::error(
                position,
                field,
                Some(&v.to_string()),
                format!("超出范围 [{}, {}]", min, max),
            ));
        }
    }
}

/// 宽松邮箱格式: local@domain.tld,不含空白
pub fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// 宽松电话格式: 数字与 + - . ( ) 空格,至少 6 位数字
pub fn looks_like_phone(value: &str) -> bool {
    let allowed = value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | '(' | ')' | ' '));
    let digits = value.chars().filter(char::is_ascii_digit).count();
    allowed && (6..=20).contains(&digits)
}

fn check_contact(
    issues: &mut Vec<ValidationIssue>,
    position: usize,
    email: &Option<String>,
    phone: &Option<String>,
) {
    if let Some(email) = email.as_deref() {
        if !looks_like_email(email) {
            issues.push(ValidationIssue::warning(position, "email", Some(email), "邮箱格式可疑"));
        }
    }
    if let Some(phone) = phone.as_deref() {
        if !looks_like_phone(phone) {
            issues.push(ValidationIssue::warning(position, "phone", Some(phone), "电话格式可疑"));
        }
    }
}

// ==========================================
// 默认规则集
// ==========================================

#[derive(Debug, Default)]
pub struct OwnerValidator;

impl OwnerValidator {
    fn check(&self, row: &OwnerRow) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        require(&mut issues, row.position, "name", &row.name);
        check_contact(&mut issues, row.position, &row.email, &row.phone);
        issues
    }
}

impl EntityValidator for OwnerValidator {
    fn validate(&self, row: &EntityRow) -> Vec<ValidationIssue> {
        match row {
            EntityRow::Owner(r) => self.check(r),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct BuildingValidator {
    current_year: i32,
}

impl BuildingValidator {
    pub fn new(current_year: i32) -> Self {
        Self { current_year }
    }

    fn check(&self, row: &BuildingRow) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        require(&mut issues, row.position, "name", &row.name);
        require(&mut issues, row.position, "address", &row.address);
        require(&mut issues, row.position, "owner_name", &row.owner_name);
        check_int_range(&mut issues, row.position, "floors", row.floors, 1, 200);
        check_int_range(
            &mut issues,
            row.position,
            "year_built",
            row.year_built,
            1800,
            self.current_year + 5,
        );
        issues
    }
}

impl Default for BuildingValidator {
    fn default() -> Self {
        Self::new(chrono::Utc::now().year())
    }
}

impl EntityValidator for BuildingValidator {
    fn validate(&self, row: &EntityRow) -> Vec<ValidationIssue> {
        match row {
            EntityRow::Building(r) => self.check(r),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct TenantValidator;

impl TenantValidator {
    fn check(&self, row: &TenantRow) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        require(&mut issues, row.position, "name", &row.name);
        check_contact(&mut issues, row.position, &row.email, &row.phone);
        issues
    }
}

impl EntityValidator for TenantValidator {
    fn validate(&self, row: &EntityRow) -> Vec<ValidationIssue> {
        match row {
            EntityRow::Tenant(r) => self.check(r),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct UnitValidator;

impl UnitValidator {
    const MAX_AREA_M2: f64 = 100_000.0;

    fn check(&self, row: &UnitRow) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        require(&mut issues, row.position, "number", &row.number);
        require(&mut issues, row.position, "building_name", &row.building_name);
        check_int_range(&mut issues, row.position, "floor", row.floor, -5, 200);

        if let Some(area) = row.area_m2 {
            if area <= 0.0 || area > Self::MAX_AREA_M2 {
                issues.push(ValidationIssue::error(
                    row.position,
                    "area_m2",
                    Some(&area.to_string()),
                    format!("面积必须在 (0, {}] 范围内", Self::MAX_AREA_M2),
                ));
            }
        }
        if let Some(rent) = row.monthly_rent {
            if rent < 0.0 {
                issues.push(ValidationIssue::error(
                    row.position,
                    "monthly_rent",
                    Some(&rent.to_string()),
                    "月租金不能为负数",
                ));
            }
        }
        issues
    }
}

impl EntityValidator for UnitValidator {
    fn validate(&self, row: &EntityRow) -> Vec<ValidationIssue> {
        match row {
            EntityRow::Unit(r) => self.check(r),
            _ => Vec::new(),
        }
    }
}

// ==========================================
// ValidatorRegistry - 按实体类型注册规则集
// ==========================================
pub struct ValidatorRegistry {
    validators: HashMap<EntityType, Box<dyn EntityValidator>>,
}

impl ValidatorRegistry {
    /// 空注册表（未注册类型不做规则校验）
    pub fn empty() -> Self {
        Self {
            validators: HashMap::new(),
        }
    }

    /// 替换某类实体的规则集
    pub fn register(&mut self, entity_type: EntityType, validator: Box<dyn EntityValidator>) {
        self.validators.insert(entity_type, validator);
    }

    pub fn get(&self, entity_type: EntityType) -> Option<&dyn EntityValidator> {
        self.validators.get(&entity_type).map(|v| v.as_ref())
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(EntityType::Owner, Box::new(OwnerValidator));
        registry.register(EntityType::Building, Box::<BuildingValidator>::default());
        registry.register(EntityType::Tenant, Box::new(TenantValidator));
        registry.register(EntityType::Unit, Box::new(UnitValidator));
        registry
    }
}

// ==========================================
// RecordValidator - 映射 + 规则校验
// ==========================================
#[derive(Default)]
pub struct RecordValidator {
    mapper: FieldMapper,
    registry: ValidatorRegistry,
}

impl RecordValidator {
    pub fn new(registry: ValidatorRegistry) -> Self {
        Self {
            mapper: FieldMapper,
            registry,
        }
    }

    /// 校验一条原始记录（映射问题 + 规则问题）
    pub fn validate(&self, record: &RawRecord, entity_type: EntityType) -> Vec<ValidationIssue> {
        self.validate_row(record, entity_type).issues
    }

    /// 校验并返回类型化行,供处理阶段使用
    pub fn validate_row(&self, record: &RawRecord, entity_type: EntityType) -> MappedRow {
        let MappedRow { row, mut issues } = self.mapper.map(record, entity_type);
        if let Some(validator) = self.registry.get(entity_type) {
            issues.extend(validator.validate(&row));
        }
        MappedRow { row, issues }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Severity;

    #[test]
    fn test_owner_missing_name_is_error() {
        let record = RawRecord::from_pairs(2, &[("name", ""), ("email", "a@b.fr")]);
        let issues = RecordValidator::default().validate(&record, EntityType::Owner);

        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_error());
        assert_eq!(issues[0].field, "name");
    }

    #[test]
    fn test_contact_format_is_warning_only() {
        let record = RawRecord::from_pairs(
            2,
            &[("name", "Alice"), ("email", "alice-at-home"), ("phone", "call me")],
        );
        let issues = RecordValidator::default().validate(&record, EntityType::Tenant);

        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.severity == Severity::Warning));
    }

    #[test]
    fn test_building_rules() {
        let validator = BuildingValidator::new(2025);
        let row = EntityRow::Building(BuildingRow {
            position: 4,
            name: Some("Tower".into()),
            address: None,
            owner_name: Some("Acme".into()),
            floors: Some(0),
            year_built: Some(2031),
            building_type: Default::default(),
        });

        let fields: Vec<String> = validator.validate(&row).into_iter().map(|i| i.field).collect();
        assert_eq!(fields, vec!["address", "floors", "year_built"]);
    }

    #[test]
    fn test_unit_rules() {
        let record = RawRecord::from_pairs(
            7,
            &[
                ("number", "B2"),
                ("building_name", "Tower"),
                ("floor", "-6"),
                ("area_m2", "0"),
                ("monthly_rent", "-1"),
            ],
        );
        let issues = RecordValidator::default().validate(&record, EntityType::Unit);

        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(|i| i.is_error() && i.position == 7));
    }

    #[test]
    fn test_registered_validator_replaces_rules() {
        struct RejectAll;
        impl EntityValidator for RejectAll {
            fn validate(&self, row: &EntityRow) -> Vec<ValidationIssue> {
                vec![ValidationIssue::error(row.position(), "name", None, "rejected")]
            }
        }

        let mut registry = ValidatorRegistry::default();
        registry.register(EntityType::Owner, Box::new(RejectAll));
        let validator = RecordValidator::new(registry);

        let record = RawRecord::from_pairs(2, &[("name", "Alice")]);
        let issues = validator.validate(&record, EntityType::Owner);
        assert_eq!(issues[0].message, "rejected");
    }

    #[test]
    fn test_loose_patterns() {
        assert!(looks_like_email("a.b@example.co.uk"));
        assert!(!looks_like_email("a@b"));
        assert!(looks_like_phone("+33 (0)1 23 45 67 89"));
        assert!(!looks_like_phone("12"));
    }
}
