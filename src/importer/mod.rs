// ==========================================
// 会众管理系统 - 导入层
// ==========================================
// 职责: 外部人员数据导入
// 支持: CSV, Planning Center JSON 导出, Excel
// 流程: 解析 → 映射 → 标准化 → 校验/去重 → 分批写入 → 报告
// ==========================================

// 模块声明
pub mod batch_importer;
pub mod conflict_handler;
pub mod data_cleaner;
pub mod dq_validator;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod importer_trait;
pub mod person_importer;
pub mod report;
pub mod session;

// 重导出核心类型
pub use batch_importer::BatchImporter;
pub use conflict_handler::{ConflictHandler, ExistingRecordIndex};
pub use data_cleaner::DataCleaner as DataCleanerImpl;
pub use dq_validator::DqValidator;
pub use error::{ImportError, PipelineResult};
pub use field_mapper::FieldMapper as FieldMapperImpl;
pub use file_parser::{CsvParser, ExcelParser, JsonExportParser, UniversalFileParser};
pub use person_importer::{ImportOutcome, PersonImporter};
pub use report::{CompletionReport, ImportReport, DEFAULT_MAX_ERRORS};
pub use session::ImportSession;

// 重导出 Trait 接口
pub use importer_trait::{
    DataCleaner, FieldMapper, FileParser, NormalizedRow, PersonWriter, StatusNormalization,
    WriteError, WriteFn,
};
