// ==========================================
// 会众管理系统 - 领域模型层
// ==========================================
// 职责: 定义导入管道的实体与类型
// 红线: 不含数据访问逻辑,不含管道逻辑
// ==========================================

pub mod person;
pub mod types;

// 重导出核心类型
pub use person::{
    full_name_key, CandidateRecord, DuplicateFlag, DuplicateReason, ExistingPerson, FailedBatch,
    FieldMapping, ImportBatch, ImportPreview, ImportProgress, ImportResult, ParsedFile, RawRecord,
};
pub use types::{ImportStage, MemberStatus, SourceFormat, TargetField};
