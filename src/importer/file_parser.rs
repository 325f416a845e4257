// ==========================================
// 物业批量导入系统 - 文件解析器实现
// ==========================================
// 阶段 0: 文件读取与解析（Row Source）
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 输出: RawRecord 序列,行号 = 表格行号（表头为第 1 行）
// 约束: 先校验文件大小; 无工作表 / 无表头 / 无数据行 → MalformedInput
// ==========================================

use crate::domain::RawRecord;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use csv::ReaderBuilder;
use std::io::Cursor;
use std::path::Path;

/// 单个工作表的解析结果
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRecords {
    pub name: String,
    pub records: Vec<RawRecord>,
}

// ==========================================
// FileParser Trait
// ==========================================
pub trait FileParser: Send + Sync {
    /// 将文件内容解析为原始记录（首个工作表）
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<Vec<RawRecord>>;
}

/// 按表头组装记录; 跳过完全空白的行
///
/// # 参数
/// - rows: (表格行号, 单元格值); 行号由调用方按源文件给出
fn build_records<I, R>(headers: &[String], rows: I) -> Vec<RawRecord>
where
    I: IntoIterator<Item = (usize, R)>,
    R: IntoIterator<Item = String>,
{
    let mut records = Vec::new();
    for (position, row) in rows {
        let fields: Vec<(String, Option<String>)> = row
            .into_iter()
            .enumerate()
            .filter_map(|(col, value)| {
                headers
                    .get(col)
                    .filter(|h| !h.is_empty())
                    .map(|h| (h.clone(), Some(value)))
            })
            .collect();

        let record = RawRecord::new(position, fields);
        if record.is_blank() {
            continue;
        }
        records.push(record);
    }
    records
}

fn ensure_data(records: Vec<RawRecord>, source: &str) -> ImportResult<Vec<RawRecord>> {
    if records.is_empty() {
        return Err(ImportError::MalformedInput(format!("{} 无数据行", source)));
    }
    Ok(records)
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<Vec<RawRecord>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(bytes);

        // 读取表头
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::MalformedInput("CSV 缺少表头".to_string()));
        }

        // csv 读取器会跳过空行,行号取记录起始行
        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            let position = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(idx + 2);
            rows.push((position, record.iter().map(|v| v.to_string()).collect::<Vec<_>>()));
        }

        ensure_data(build_records(&headers, rows), "CSV")
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    fn range_to_records(range: &Range<Data>, sheet: &str) -> ImportResult<Vec<RawRecord>> {
        let mut rows = range.rows();
        let header_row = rows
            .next()
            .ok_or_else(|| ImportError::MalformedInput(format!("工作表 {} 无表头", sheet)))?;

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::MalformedInput(format!("工作表 {} 无表头", sheet)));
        }

        // range 从首个非空单元格开始; 表头所在的表格行号 = 起始行 + 1
        let header_line = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
        let data = rows.enumerate().map(|(idx, row)| {
            (
                header_line + 1 + idx,
                row.iter().map(|cell| cell.to_string()).collect::<Vec<_>>(),
            )
        });
        Ok(build_records(&headers, data))
    }

    /// 解析全部工作表（空工作表跳过）
    pub fn parse_workbook(&self, bytes: &[u8]) -> ImportResult<Vec<SheetRecords>> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

        let sheet_names = workbook.sheet_names().to_vec();
        if sheet_names.is_empty() {
            return Err(ImportError::MalformedInput("Excel 文件无工作表".to_string()));
        }

        let mut sheets = Vec::new();
        for name in sheet_names {
            let range = workbook.worksheet_range(&name)?;
            if range.is_empty() {
                tracing::debug!(sheet = %name, "跳过空工作表");
                continue;
            }
            let records = Self::range_to_records(&range, &name)?;
            if !records.is_empty() {
                sheets.push(SheetRecords { name, records });
            }
        }

        if sheets.is_empty() {
            return Err(ImportError::MalformedInput("Excel 文件无数据行".to_string()));
        }
        Ok(sheets)
    }
}

impl FileParser for ExcelParser {
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<Vec<RawRecord>> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

        // 读取第一个 sheet
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::MalformedInput("Excel 文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;
        ensure_data(Self::range_to_records(&range, &sheet_name)?, "Excel")
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser {
    max_file_size: u64,
}

impl UniversalFileParser {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    fn check_size(&self, size: u64) -> ImportResult<()> {
        if size > self.max_file_size {
            return Err(ImportError::FileTooLarge {
                size,
                limit: self.max_file_size,
            });
        }
        Ok(())
    }

    fn parser_for(ext: &str) -> ImportResult<Box<dyn FileParser>> {
        match ext.to_lowercase().as_str() {
            "csv" => Ok(Box::new(CsvParser)),
            "xlsx" | "xls" | "xlsm" => Ok(Box::new(ExcelParser)),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }

    /// 解析内存中的文件内容
    ///
    /// # 参数
    /// - bytes: 文件内容
    /// - ext: 扩展名（不含点）
    pub fn parse_bytes(&self, bytes: &[u8], ext: &str) -> ImportResult<Vec<RawRecord>> {
        self.check_size(bytes.len() as u64)?;
        Self::parser_for(ext)?.parse_bytes(bytes)
    }

    /// 读取并解析文件（首个工作表）
    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<Vec<RawRecord>> {
        let path = file_path.as_ref();
        let ext = extension(path);
        let bytes = self.read_checked(path)?;
        Self::parser_for(&ext)?.parse_bytes(&bytes)
    }

    /// 读取并解析多工作表文件; CSV 视为单个工作表（名称取文件名）
    pub fn parse_workbook<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<Vec<SheetRecords>> {
        let path = file_path.as_ref();
        let ext = extension(path);

        match ext.as_str() {
            "csv" => {
                let bytes = self.read_checked(path)?;
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                Ok(vec![SheetRecords {
                    name,
                    records: CsvParser.parse_bytes(&bytes)?,
                }])
            }
            "xlsx" | "xls" | "xlsm" => {
                let bytes = self.read_checked(path)?;
                ExcelParser.parse_workbook(&bytes)
            }
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }

    fn read_checked(&self, path: &Path) -> ImportResult<Vec<u8>> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        self.check_size(std::fs::metadata(path)?.len())?;
        Ok(std::fs::read(path)?)
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_csv_parser_positions_and_values() {
        let csv = "Name,Email\nAlice,alice@example.com\nBob,\n";
        let records = CsvParser.parse_bytes(csv.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source_position(), 2);
        assert_eq!(records[0].get("name"), Some("Alice"));
        assert_eq!(records[1].get("email"), None);
    }

    #[test]
    fn test_csv_parser_skip_empty_rows_without_renumbering() {
        let csv = "name,email\nA,\n,\nB,\n";
        let records = CsvParser.parse_bytes(csv.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].source_position(), 4);
    }

    #[test]
    fn test_csv_blank_line_keeps_sheet_row_numbers() {
        let csv = "name,email\nA,a@x.fr\n\nB,b@x.fr\n";
        let records = CsvParser.parse_bytes(csv.as_bytes()).unwrap();

        let positions: Vec<usize> = records.iter().map(|r| r.source_position()).collect();
        assert_eq!(positions, vec![2, 4]);
        assert_eq!(records[1].get("name"), Some("B"));
    }

    #[test]
    fn test_excel_range_offset_keeps_sheet_row_numbers() {
        // 表头位于第 3 行（0 基第 2 行）,数据位于第 4、6 行
        let mut range: Range<Data> = Range::new((2, 1), (5, 2));
        range.set_value((2, 1), Data::String("name".into()));
        range.set_value((2, 2), Data::String("email".into()));
        range.set_value((3, 1), Data::String("A".into()));
        range.set_value((5, 1), Data::String("B".into()));

        let records = ExcelParser::range_to_records(&range, "owners").unwrap();

        let positions: Vec<usize> = records.iter().map(|r| r.source_position()).collect();
        assert_eq!(positions, vec![4, 6]);
    }

    #[test]
    fn test_csv_without_data_rows_is_malformed() {
        let result = CsvParser.parse_bytes(b"name,email\n");
        assert!(matches!(result, Err(ImportError::MalformedInput(_))));

        let result = CsvParser.parse_bytes(b"");
        assert!(matches!(result, Err(ImportError::MalformedInput(_))));
    }

    #[test]
    fn test_file_size_checked_before_parsing() {
        let parser = UniversalFileParser::new(4);
        let result = parser.parse_bytes(b"name\nAlice\n", "csv");
        assert!(matches!(result, Err(ImportError::FileTooLarge { limit: 4, .. })));
    }

    #[test]
    fn test_unsupported_extension() {
        let parser = UniversalFileParser::new(1024);
        let result = parser.parse_bytes(b"{}", "json");
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_invalid_excel_bytes() {
        let result = ExcelParser.parse_bytes(b"not a workbook");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_csv_file_by_path() {
        let mut temp_file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(temp_file, "name,owner_type").unwrap();
        writeln!(temp_file, "Acme,COMPANY").unwrap();

        let parser = UniversalFileParser::new(1024);
        let sheets = parser.parse_workbook(temp_file.path()).unwrap();

        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].records[0].get("owner_type"), Some("COMPANY"));
    }

    #[test]
    fn test_file_not_found() {
        let parser = UniversalFileParser::new(1024);
        let result = parser.parse("non_existent.csv");
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }
}
