// ==========================================
// 物业批量导入系统 - 导入层
// ==========================================
// 职责: 外部表格 → 业主/楼栋/租户/单元 实体
// 支持: Excel (.xlsx / .xls), CSV
// 流程: 解析 → 字段映射 → 校验闸门 → 分批创建 → 进度/结果汇总
// ==========================================

// 模块声明
pub mod batch_processor;
pub mod entity_cache;
pub mod error;
pub mod error_classifier;
pub mod field_mapper;
pub mod file_parser;
pub mod orchestrator;
pub mod progress_tracker;
pub mod row_creator;
pub mod template;
pub mod validator;

// 重导出核心类型
pub use batch_processor::{process_batch, split_batches, BatchOptions};
pub use entity_cache::{CacheStats, EntityCache, EntityCaches};
pub use error::{ImportError, RowError};
pub use field_mapper::{canonical_columns, FieldMapper, MappedRow};
pub use file_parser::{CsvParser, ExcelParser, FileParser, SheetRecords, UniversalFileParser};
pub use orchestrator::{ImportOptions, ImportOrchestrator, ValidationPolicy};
pub use progress_tracker::{LoggingObserver, ProgressObserver, ProgressTracker, ProgressUpdate};
pub use row_creator::{create_row, CreationContext};
pub use template::{template_for, ImportTemplate};
pub use validator::{EntityValidator, RecordValidator, ValidatorRegistry};
