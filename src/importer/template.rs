// ==========================================
// 物业批量导入系统 - 导入模板
// ==========================================
// 职责: 生成各实体类型的空白上传模板（标准列 + 两行示例）
// 纯函数,无状态
// ==========================================

use crate::domain::EntityType;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::canonical_columns;
use serde::Serialize;

/// 导入模板
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportTemplate {
    pub entity_type: EntityType,
    pub columns: Vec<String>,
    pub example_rows: Vec<Vec<String>>,
}

fn example_rows(entity_type: EntityType) -> [&'static [&'static str]; 2] {
    match entity_type {
        EntityType::Owner => [
            &["Marie Dupont", "marie.dupont@example.com", "+33 1 23 45 67 89", "12 rue de la Paix, Paris", "INDIVIDUAL"],
            &["Immo Holding SA", "contact@immo-holding.example", "+33 4 56 78 90 12", "3 quai Perrache, Lyon", "COMPANY"],
        ],
        EntityType::Building => [
            &["Résidence Les Tilleuls", "8 avenue Foch, Paris", "Marie Dupont", "6", "1998", "RESIDENTIAL"],
            &["Centre Perrache", "3 quai Perrache, Lyon", "Immo Holding SA", "12", "2010", "COMMERCIAL"],
        ],
        EntityType::Tenant => [
            &["Jean Martin", "jean.martin@example.com", "+33 6 12 34 56 78", "INDIVIDUAL"],
            &["Boulangerie du Coin SARL", "contact@boulangerie.example", "+33 4 78 00 00 00", "COMPANY"],
        ],
        EntityType::Unit => [
            &["A101", "Résidence Les Tilleuls", "APARTMENT", "1", "54.5", "980", "Jean Martin", "OCCUPIED"],
            &["RDC-02", "Centre Perrache", "RETAIL", "0", "120", "2400", "", "VACANT"],
        ],
    }
}

/// 生成模板
pub fn template_for(entity_type: EntityType) -> ImportTemplate {
    ImportTemplate {
        entity_type,
        columns: canonical_columns(entity_type)
            .iter()
            .map(|c| c.to_string())
            .collect(),
        example_rows: example_rows(entity_type)
            .iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect(),
    }
}

impl ImportTemplate {
    /// 渲染为 CSV 文本
    pub fn to_csv(&self) -> ImportResult<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.example_rows {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ImportError::InternalError(e.to_string()))?;
        String::from_utf8(bytes)
            .map_err(|e| ImportError::InternalError(e.to_string()))
    }
}
