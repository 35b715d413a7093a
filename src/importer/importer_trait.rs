// ==========================================
// 会众管理系统 - 人员导入 Trait
// ==========================================
// 职责: 定义导入管道各阶段接口（不包含实现）
// 管道: 解析 → 映射 → 标准化 → 校验/去重 → 分批写入 → 报告
// ==========================================

use crate::domain::person::{CandidateRecord, FieldMapping, ParsedFile, RawRecord};
use crate::domain::types::{MemberStatus, SourceFormat, TargetField};
use crate::importer::error::PipelineResult;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::error::Error;
use std::future::Future;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（阶段 0）
// 实现者: CsvParser, JsonExportParser, ExcelParser, UniversalFileParser
pub trait FileParser: Send + Sync {
    /// 解析器固定处理的源格式；按输入内容选择格式的解析器返回 None
    fn format(&self) -> Option<SourceFormat>;

    /// 将文件内容解析为表头 + 原始行记录
    ///
    /// # 返回
    /// - Ok(ParsedFile): 解析结果（列数不符的行已记录在 skipped_rows）
    /// - Err(FormatError): 无表头、无数据行、JSON 结构不符
    ///
    /// # 说明
    /// - 纯函数，不做 I/O
    fn parse_bytes(&self, bytes: &[u8]) -> PipelineResult<ParsedFile>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 用途: 字段映射接口（阶段 1）
// 实现者: field_mapper::FieldMapper
pub trait FieldMapper: Send + Sync {
    /// 按同义词表自动映射表头；未命中的列映射为 Skip
    fn auto_map(&self, headers: &[String]) -> Vec<FieldMapping>;

    /// 将一行原始记录按映射投影为 目标字段 → 原始值
    ///
    /// # 规则
    /// - Skip 列忽略
    /// - 空值不覆盖已有值
    /// - 同一目标字段多次映射时，后出现的非空值生效
    fn project(&self, raw: &RawRecord, mappings: &[FieldMapping]) -> BTreeMap<TargetField, String>;
}

// ==========================================
// 状态标准化结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusNormalization {
    /// 源值为空
    Empty,
    /// 命中状态表
    Recognized(MemberStatus),
    /// 未命中，回落到默认状态
    Defaulted { raw: String, status: MemberStatus },
}

impl StatusNormalization {
    pub fn status(&self) -> Option<MemberStatus> {
        match self {
            StatusNormalization::Empty => None,
            StatusNormalization::Recognized(status) => Some(*status),
            StatusNormalization::Defaulted { status, .. } => Some(*status),
        }
    }
}

// ==========================================
// NormalizedRow - 单行标准化结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    pub record: CandidateRecord,
    /// 未识别的原始状态标签（已回落到默认状态）
    pub unrecognized_status: Option<String>,
}

// ==========================================
// DataCleaner Trait
// ==========================================
// 用途: 值标准化接口（阶段 2）
// 实现者: data_cleaner::DataCleaner
pub trait DataCleaner: Send + Sync {
    /// 文本清洗（TRIM，空串 → None）
    fn clean_text(&self, value: &str) -> Option<String>;

    /// 邮箱清洗（TRIM，空串 → None，保留大小写）
    fn normalize_email(&self, value: &str) -> Option<String>;

    /// 状态标签标准化（大小写不敏感）
    fn normalize_status(&self, value: &str) -> StatusNormalization;

    /// 日期解析；无法识别返回 None（不报错）
    fn parse_date(&self, value: &str) -> Option<NaiveDate>;

    /// 将投影后的字段标准化为候选记录
    fn normalize_fields(
        &self,
        fields: &BTreeMap<TargetField, String>,
        row_number: usize,
    ) -> NormalizedRow {
        let mut record = CandidateRecord {
            row_number,
            ..Default::default()
        };
        let mut unrecognized_status = None;

        for (target, value) in fields {
            match target {
                TargetField::FirstName => record.first_name = self.clean_text(value),
                TargetField::LastName => record.last_name = self.clean_text(value),
                TargetField::Email => record.email = self.normalize_email(value),
                TargetField::Phone => record.phone = self.clean_text(value),
                TargetField::Address => record.address = self.clean_text(value),
                TargetField::City => record.city = self.clean_text(value),
                TargetField::State => record.state = self.clean_text(value),
                TargetField::Zip => record.zip = self.clean_text(value),
                TargetField::Notes => record.notes = self.clean_text(value),
                TargetField::BirthDate => record.birth_date = self.parse_date(value),
                TargetField::JoinDate => record.join_date = self.parse_date(value),
                TargetField::BaptismDate => record.baptism_date = self.parse_date(value),
                TargetField::Status => {
                    let normalized = self.normalize_status(value);
                    record.status = normalized.status();
                    if let StatusNormalization::Defaulted { raw, .. } = normalized {
                        unrecognized_status = Some(raw);
                    }
                }
                TargetField::Skip => {}
            }
        }

        NormalizedRow {
            record,
            unrecognized_status,
        }
    }
}

// ==========================================
// PersonWriter Trait
// ==========================================
// 用途: 持久化回调（阶段 4，由调用方提供）
// 实现者: PersonRepositoryImpl, WriteFn
pub type WriteError = Box<dyn Error + Send + Sync>;

#[async_trait]
pub trait PersonWriter: Send + Sync {
    /// 写入一批记录；返回 Err 时整批计为失败
    async fn write_batch(&self, records: &[CandidateRecord]) -> Result<(), WriteError>;
}

/// 将异步闭包适配为 PersonWriter
///
/// # 示例
/// ```no_run
/// use congregation_import::importer::{WriteError, WriteFn};
/// use congregation_import::CandidateRecord;
///
/// let writer = WriteFn(|records: Vec<CandidateRecord>| async move {
///     println!("写入 {} 条", records.len());
///     Ok::<(), WriteError>(())
/// });
/// ```
pub struct WriteFn<F>(pub F);

#[async_trait]
impl<F, Fut> PersonWriter for WriteFn<F>
where
    F: Fn(Vec<CandidateRecord>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), WriteError>> + Send,
{
    async fn write_batch(&self, records: &[CandidateRecord]) -> Result<(), WriteError> {
        (self.0)(records.to_vec()).await
    }
}
