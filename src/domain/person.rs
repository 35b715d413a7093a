// ==========================================
// 会众管理系统 - 人员导入领域模型
// ==========================================
// 职责: 导入管道各阶段的数据结构
// 生命周期: 仅存在于单次导入会话内，落库内容由 PersonWriter 决定
// ==========================================

use crate::domain::types::{MemberStatus, SourceFormat, TargetField};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// RawRecord - 原始行记录
// ==========================================
// 用途: 文件解析产物（列名 → 原始字符串值）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub row_number: usize,               // 源文件行号（表头为第 1 行）
    pub values: HashMap<String, String>, // 列名 → 值（已 TRIM）
}

impl RawRecord {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }
}

// ==========================================
// ParsedFile - 解析结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedFile {
    pub format: SourceFormat,
    pub headers: Vec<String>,     // 表头（保持源顺序）
    pub rows: Vec<RawRecord>,     // 数据行
    pub skipped_rows: Vec<usize>, // 因列数不符被丢弃的行号
}

// ==========================================
// FieldMapping - 字段映射
// ==========================================
// 用户可在预览前任意修改；不强制单射
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub source: String,      // 源列名
    pub target: TargetField, // 目标字段（Skip = 不导入）
}

impl FieldMapping {
    pub fn new(source: impl Into<String>, target: TargetField) -> Self {
        Self {
            source: source.into(),
            target,
        }
    }
}

// ==========================================
// CandidateRecord - 待导入人员
// ==========================================
// 红线: first_name / last_name 均非空才可进入提交列表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    // ===== 姓名 =====
    pub first_name: Option<String>,
    pub last_name: Option<String>,

    // ===== 联系方式 =====
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,

    // ===== 会众信息 =====
    pub status: Option<MemberStatus>,
    pub birth_date: Option<NaiveDate>,
    pub join_date: Option<NaiveDate>,
    pub baptism_date: Option<NaiveDate>,
    pub notes: Option<String>,

    // 元信息
    pub row_number: usize, // 源文件行号
}

impl CandidateRecord {
    pub fn has_full_name(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.first_name) && present(&self.last_name)
    }

    /// 去重用邮箱键（小写）
    pub fn email_key(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
    }

    /// 去重用姓名键（"first last" 小写）
    pub fn full_name_key(&self) -> Option<String> {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => full_name_key(first, last),
            _ => None,
        }
    }
}

/// 组合姓名键；任一部分为空返回 None
pub fn full_name_key(first: &str, last: &str) -> Option<String> {
    let first = first.trim();
    let last = last.trim();
    if first.is_empty() || last.is_empty() {
        return None;
    }
    Some(format!("{} {}", first, last).to_lowercase())
}

// ==========================================
// ExistingPerson - 已有人员快照
// ==========================================
// 用途: 仅用于构建去重索引
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingPerson {
    pub id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

// ==========================================
// DuplicateFlag - 重复标记
// ==========================================
// 仅作提示，不阻止导入
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateFlag {
    pub row_number: usize,
    pub reason: DuplicateReason,
    pub matched_key: String, // 命中的邮箱或姓名（小写）
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateReason {
    ExistingEmail, // 与已有人员邮箱相同
    ExistingName,  // 与已有人员姓名相同
    InFileEmail,   // 与本文件前面的行邮箱相同
    InFileName,    // 与本文件前面的行姓名相同
}

// ==========================================
// ImportPreview - 导入预览
// ==========================================
// 每次生成预览时整体替换，不做合并
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportPreview {
    pub total_rows: usize,                // 参与校验的行数
    pub valid_count: usize,               // 可提交行数（含重复）
    pub duplicate_count: usize,           // 重复行数
    pub errors: Vec<String>,              // 行级错误（按行序）
    pub duplicates: Vec<DuplicateFlag>,   // 重复明细
    pub coerced_statuses: usize,          // 未识别状态被回落的行数
    pub skipped_rows: usize,              // 解析阶段因列数不符丢弃的行数
    pub records: Vec<CandidateRecord>,    // 可提交记录
}

impl ImportPreview {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

// ==========================================
// ImportProgress - 导入进度
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportProgress {
    pub completed_batches: usize,
    pub total_batches: usize,
    pub percent: u8, // 0-100
    pub success: usize,
    pub failed: usize,
}

// ==========================================
// FailedBatch - 写入失败的批次
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedBatch {
    pub batch_index: usize, // 从 0 开始
    pub first_row: usize,   // 批次内首条记录的源行号
    pub last_row: usize,    // 批次内末条记录的源行号
    pub record_count: usize,
    pub message: String,
}

// ==========================================
// ImportResult - 导入结果
// ==========================================
// 红线: success + failed == 提交记录数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResult {
    pub session_id: String,
    pub success: usize,
    pub failed: usize,
    pub total_batches: usize,
    pub failed_batches: Vec<FailedBatch>,
    pub elapsed_ms: u64,
}

// ==========================================
// ImportBatch - 导入批次历史
// ==========================================
// 对齐: import_batch 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String,          // 会话 ID（UUID）
    pub file_name: Option<String>, // 源文件名
    pub total_rows: i64,
    pub valid_rows: i64,
    pub duplicate_rows: i64,
    pub error_rows: i64,
    pub success_rows: i64,
    pub failed_rows: i64,
    pub imported_at: DateTime<Utc>,
    pub elapsed_ms: i64,
}

impl ImportBatch {
    pub fn from_outcome(
        file_name: Option<String>,
        preview: &ImportPreview,
        result: &ImportResult,
    ) -> Self {
        Self {
            batch_id: result.session_id.clone(),
            file_name,
            total_rows: preview.total_rows as i64,
            valid_rows: preview.valid_count as i64,
            duplicate_rows: preview.duplicate_count as i64,
            error_rows: preview.error_count() as i64,
            success_rows: result.success as i64,
            failed_rows: result.failed as i64,
            imported_at: Utc::now(),
            elapsed_ms: result.elapsed_ms as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_key_lowercase() {
        assert_eq!(
            full_name_key(" Jane ", "DOE"),
            Some("jane doe".to_string())
        );
        assert_eq!(full_name_key("Jane", "  "), None);
    }

    #[test]
    fn test_candidate_email_key() {
        let record = CandidateRecord {
            email: Some(" A@B.COM ".to_string()),
            ..Default::default()
        };
        assert_eq!(record.email_key(), Some("a@b.com".to_string()));
        assert_eq!(CandidateRecord::default().email_key(), None);
    }

    #[test]
    fn test_has_full_name() {
        let mut record = CandidateRecord {
            first_name: Some("Jane".to_string()),
            ..Default::default()
        };
        assert!(!record.has_full_name());
        record.last_name = Some("Doe".to_string());
        assert!(record.has_full_name());
    }
}
