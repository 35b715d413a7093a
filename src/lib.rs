// ==========================================
// 会众管理系统 - 人员导入核心库
// ==========================================
// 技术栈: Rust + SQLite
// 定位: 会众 CRM 的人员导入管道（解析 → 映射 → 校验 → 分批写入）
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ImportStage, MemberStatus, SourceFormat, TargetField};

// 领域实体
pub use domain::{
    CandidateRecord, DuplicateFlag, DuplicateReason, ExistingPerson, FieldMapping, ImportBatch,
    ImportPreview, ImportProgress, ImportResult, ParsedFile, RawRecord,
};

// 导入管道
pub use importer::{
    ImportError, ImportSession, PersonImporter, PersonWriter, PipelineResult, WriteFn,
};

// 配置
pub use config::{ConfigManager, ImportConfigReader, ImportOptions, MappingProfile};

// 仓储
pub use repository::{PersonRepository, PersonRepositoryImpl};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "会众管理系统 - 人员导入";
