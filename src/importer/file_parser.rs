// ==========================================
// 会众管理系统 - 文件解析器实现
// ==========================================
// 阶段 0: 文件读取与解析
// 支持: CSV (.csv) / Planning Center JSON 导出 (.json) / Excel (.xlsx/.xls)
// ==========================================

use crate::domain::person::{ParsedFile, RawRecord};
use crate::domain::types::SourceFormat;
use crate::importer::error::{ImportError, PipelineResult};
use crate::importer::importer_trait::FileParser;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{NaiveDate, TimeDelta};
use csv::ReaderBuilder;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::io::Cursor;
use std::path::Path;
use tracing::warn;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// OLE/CFB 容器头（BIFF .xls）
const CFB_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

// ==========================================
// CSV Parser 实现
// ==========================================
// 规则:
// - 分隔符 ','，引号 '"'，'""' 转义，CRLF/LF 均可
// - 表头与值均 TRIM
// - 列数与表头不符的行: 宽松模式丢弃并记录行号，严格模式报错
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvParser {
    pub strict: bool,
}

impl CsvParser {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }
}

impl FileParser for CsvParser {
    fn format(&self) -> Option<SourceFormat> {
        Some(SourceFormat::Csv)
    }

    fn parse_bytes(&self, bytes: &[u8]) -> PipelineResult<ParsedFile> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致，由下方统一处理
            .from_reader(strip_bom(bytes));

        // 读取表头
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::FormatError("CSV 文件缺少表头".to_string()));
        }

        let mut rows = Vec::new();
        let mut skipped_rows = Vec::new();

        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            // 行号取记录起始行（表头为第 1 行）
            let row_number = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(idx + 2);

            if record.len() != headers.len() {
                if self.strict {
                    return Err(ImportError::ColumnCountMismatch {
                        row: row_number,
                        expected: headers.len(),
                        found: record.len(),
                    });
                }
                warn!(
                    row = row_number,
                    expected = headers.len(),
                    found = record.len(),
                    "列数不符，丢弃该行"
                );
                skipped_rows.push(row_number);
                continue;
            }

            let values: HashMap<String, String> = headers
                .iter()
                .zip(record.iter())
                .map(|(header, value)| (header.clone(), value.trim().to_string()))
                .collect();

            rows.push(RawRecord { row_number, values });
        }

        if rows.is_empty() {
            return Err(ImportError::FormatError("CSV 文件没有数据行".to_string()));
        }

        Ok(ParsedFile {
            format: SourceFormat::Csv,
            headers,
            rows,
            skipped_rows,
        })
    }
}

// ==========================================
// JSON Parser 实现（Planning Center 导出）
// ==========================================
// 结构: { "data": [ { "attributes": { ... } }, ... ] }
// 表头 = 所有 attributes 键的并集（排序）
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExportParser {
    pub strict: bool,
}

impl JsonExportParser {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    fn stringify(value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s.trim().to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            other => other.to_string(),
        }
    }
}

impl FileParser for JsonExportParser {
    fn format(&self) -> Option<SourceFormat> {
        Some(SourceFormat::Json)
    }

    fn parse_bytes(&self, bytes: &[u8]) -> PipelineResult<ParsedFile> {
        let root: Value = serde_json::from_slice(strip_bom(bytes))?;

        let top = root
            .as_object()
            .ok_or_else(|| ImportError::FormatError("JSON 顶层必须为对象".to_string()))?;

        let data = top
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| ImportError::FormatError("JSON 缺少 data 数组".to_string()))?;

        if data.is_empty() {
            return Err(ImportError::FormatError("JSON data 数组为空".to_string()));
        }

        let mut items: Vec<(usize, HashMap<String, String>)> = Vec::with_capacity(data.len());
        let mut header_set: BTreeSet<String> = BTreeSet::new();
        let mut skipped_rows = Vec::new();

        for (idx, item) in data.iter().enumerate() {
            let row_number = idx + 1;
            let Some(attributes) = item.get("attributes").and_then(Value::as_object) else {
                if self.strict {
                    return Err(ImportError::FormatError(format!(
                        "第 {} 项缺少 attributes 对象",
                        row_number
                    )));
                }
                warn!(row = row_number, "JSON 项缺少 attributes，跳过");
                skipped_rows.push(row_number);
                continue;
            };

            let values: HashMap<String, String> = attributes
                .iter()
                .map(|(k, v)| (k.trim().to_string(), Self::stringify(v)))
                .collect();
            header_set.extend(values.keys().cloned());
            items.push((row_number, values));
        }

        if items.is_empty() {
            return Err(ImportError::FormatError(
                "JSON 中没有可用的数据项".to_string(),
            ));
        }

        let headers: Vec<String> = header_set.into_iter().collect();

        // 缺失的键补空串，保证每行对每个表头都有值
        let rows = items
            .into_iter()
            .map(|(row_number, mut values)| {
                for header in &headers {
                    values.entry(header.clone()).or_default();
                }
                RawRecord { row_number, values }
            })
            .collect();

        Ok(ParsedFile {
            format: SourceFormat::Json,
            headers,
            rows,
            skipped_rows,
        })
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
// 读取第一个工作表，第一行为表头
// 支持 OOXML (.xlsx, zip) 与 BIFF (.xls, OLE/CFB 容器)
#[derive(Debug, Clone, Copy, Default)]
pub struct ExcelParser;

impl ExcelParser {
    /// Excel 序列日期 → YYYY-MM-DD
    fn serial_to_date(serial: f64) -> Option<NaiveDate> {
        let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
        if !serial.is_finite() {
            return None;
        }
        base.checked_add_signed(TimeDelta::try_days(serial.floor() as i64)?)
    }

    fn cell_to_string(cell: &Data) -> String {
        match cell {
            Data::Empty | Data::Error(_) => String::new(),
            Data::String(s) => s.trim().to_string(),
            Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
            Data::Float(f) => f.to_string(),
            Data::Int(i) => i.to_string(),
            Data::Bool(b) => b.to_string(),
            Data::DateTime(dt) => Self::serial_to_date(dt.as_f64())
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        }
    }
}

impl FileParser for ExcelParser {
    fn format(&self) -> Option<SourceFormat> {
        Some(SourceFormat::Excel)
    }

    fn parse_bytes(&self, bytes: &[u8]) -> PipelineResult<ParsedFile> {
        // 自动识别 xlsx / xls (BIFF) / xlsb / ods
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

        // 读取第一个 sheet
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::FormatError("Excel 文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;
        let first_row = range.start().map(|(r, _)| r as usize).unwrap_or(0) + 1;

        // 提取表头（第一行）
        let mut sheet_rows = range.rows();
        let header_row = sheet_rows
            .next()
            .ok_or_else(|| ImportError::FormatError("Excel 文件缺少表头".to_string()))?;

        let headers: Vec<String> = header_row.iter().map(Self::cell_to_string).collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::FormatError("Excel 文件缺少表头".to_string()));
        }

        let mut rows = Vec::new();
        for (idx, data_row) in sheet_rows.enumerate() {
            let values: HashMap<String, String> = headers
                .iter()
                .zip(data_row.iter())
                .map(|(header, cell)| (header.clone(), Self::cell_to_string(cell)))
                .collect();

            // 工作表区域内的整行空白
            if values.values().all(|v| v.is_empty()) {
                continue;
            }

            rows.push(RawRecord {
                row_number: first_row + idx + 1,
                values,
            });
        }

        if rows.is_empty() {
            return Err(ImportError::FormatError("Excel 文件没有数据行".to_string()));
        }

        Ok(ParsedFile {
            format: SourceFormat::Excel,
            headers,
            rows,
            skipped_rows: Vec::new(),
        })
    }
}

// ==========================================
// 通用文件解析器（根据扩展名/内容自动选择）
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct UniversalFileParser {
    pub strict: bool,
}

impl UniversalFileParser {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    /// 按扩展名判断格式；无扩展名或 .txt 时按内容嗅探
    pub fn detect_format(path: Option<&Path>, bytes: &[u8]) -> PipelineResult<SourceFormat> {
        let ext = path
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "json" => Ok(SourceFormat::Json),
            "xlsx" | "xls" => Ok(SourceFormat::Excel),
            "" | "txt" => Ok(Self::sniff(bytes)),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }

    fn sniff(bytes: &[u8]) -> SourceFormat {
        let body = strip_bom(bytes);
        if body.starts_with(b"PK") || body.starts_with(CFB_MAGIC) {
            return SourceFormat::Excel;
        }
        match body.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => SourceFormat::Json,
            _ => SourceFormat::Csv,
        }
    }

    /// 按指定格式解析
    pub fn parse_as(&self, format: SourceFormat, bytes: &[u8]) -> PipelineResult<ParsedFile> {
        match format {
            SourceFormat::Csv => CsvParser::new(self.strict).parse_bytes(bytes),
            SourceFormat::Json => JsonExportParser::new(self.strict).parse_bytes(bytes),
            SourceFormat::Excel => ExcelParser.parse_bytes(bytes),
        }
    }

    /// 读取并解析文件
    pub fn parse_path<P: AsRef<Path>>(&self, file_path: P) -> PipelineResult<ParsedFile> {
        let path = file_path.as_ref();

        // 检查文件存在
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let bytes = std::fs::read(path)?;
        let format = Self::detect_format(Some(path), &bytes)?;
        self.parse_as(format, &bytes)
    }
}

impl FileParser for UniversalFileParser {
    fn format(&self) -> Option<SourceFormat> {
        None
    }

    fn parse_bytes(&self, bytes: &[u8]) -> PipelineResult<ParsedFile> {
        self.parse_as(Self::sniff(bytes), bytes)
    }
}
