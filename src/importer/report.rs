// ==========================================
// 会众管理系统 - 预览/完成报告
// ==========================================
// 阶段 5: 纯汇总（计数 + 截取前 N 条错误），不含独立业务逻辑
// 输出: Serialize（CLI --json）/ Display（终端文本）
// ==========================================

use crate::domain::person::{
    DuplicateFlag, DuplicateReason, FailedBatch, ImportPreview, ImportResult,
};
use crate::i18n::t_in;
use serde::Serialize;
use std::fmt;

/// 预览报告默认展示的错误条数
pub const DEFAULT_MAX_ERRORS: usize = 5;

// ==========================================
// ImportReport - 预览报告
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub total_rows: usize,
    pub valid_count: usize,
    pub duplicate_count: usize,
    pub error_count: usize,
    pub skipped_rows: usize,
    pub coerced_statuses: usize,
    pub errors: Vec<String>,   // 前 N 条
    pub more_errors: usize,    // 未展示的错误数
    pub duplicates: Vec<DuplicateFlag>,
    #[serde(skip)]
    locale: String,
}

impl ImportReport {
    pub fn from_preview(preview: &ImportPreview, max_errors: usize) -> Self {
        let shown = preview.errors.len().min(max_errors);
        Self {
            total_rows: preview.total_rows,
            valid_count: preview.valid_count,
            duplicate_count: preview.duplicate_count,
            error_count: preview.error_count(),
            skipped_rows: preview.skipped_rows,
            coerced_statuses: preview.coerced_statuses,
            errors: preview.errors[..shown].to_vec(),
            more_errors: preview.errors.len() - shown,
            duplicates: preview.duplicates.clone(),
            locale: crate::config::import_config_trait::DEFAULT_LOCALE.to_string(),
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = |key: &str| t_in(&self.locale, key, &[]);

        writeln!(f, "{}", label("report.preview_title"))?;
        writeln!(f, "  {}: {}", label("report.total_rows"), self.total_rows)?;
        writeln!(f, "  {}: {}", label("report.valid_rows"), self.valid_count)?;
        writeln!(f, "  {}: {}", label("report.duplicate_rows"), self.duplicate_count)?;
        writeln!(f, "  {}: {}", label("report.error_rows"), self.error_count)?;
        if self.skipped_rows > 0 {
            writeln!(f, "  {}: {}", label("report.skipped_rows"), self.skipped_rows)?;
        }
        if self.coerced_statuses > 0 {
            writeln!(f, "  {}: {}", label("report.coerced_statuses"), self.coerced_statuses)?;
        }
        for error in &self.errors {
            writeln!(f, "    - {}", error)?;
        }
        if self.more_errors > 0 {
            let count = self.more_errors.to_string();
            writeln!(
                f,
                "    {}",
                t_in(&self.locale, "report.more_errors", &[("count", count.as_str())])
            )?;
        }
        for dup in &self.duplicates {
            let key = match dup.reason {
                DuplicateReason::ExistingEmail => "import.duplicate_existing_email",
                DuplicateReason::ExistingName => "import.duplicate_existing_name",
                DuplicateReason::InFileEmail => "import.duplicate_in_file_email",
                DuplicateReason::InFileName => "import.duplicate_in_file_name",
            };
            let row = dup.row_number.to_string();
            writeln!(
                f,
                "    ~ {}",
                t_in(&self.locale, key, &[("row", row.as_str()), ("key", dup.matched_key.as_str())])
            )?;
        }
        Ok(())
    }
}

// ==========================================
// CompletionReport - 完成报告
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct CompletionReport {
    pub session_id: String,
    pub success: usize,
    pub failed: usize,
    pub total_batches: usize,
    pub failed_batches: Vec<FailedBatch>,
    pub elapsed_ms: u64,
    #[serde(skip)]
    locale: String,
}

impl CompletionReport {
    pub fn from_result(result: &ImportResult) -> Self {
        Self {
            session_id: result.session_id.clone(),
            success: result.success,
            failed: result.failed,
            total_batches: result.total_batches,
            failed_batches: result.failed_batches.clone(),
            elapsed_ms: result.elapsed_ms,
            locale: crate::config::import_config_trait::DEFAULT_LOCALE.to_string(),
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }
}

impl fmt::Display for CompletionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = |key: &str| t_in(&self.locale, key, &[]);

        writeln!(f, "{} ({})", label("report.complete_title"), self.session_id)?;
        writeln!(f, "  {}: {}", label("report.success_rows"), self.success)?;
        writeln!(f, "  {}: {}", label("report.failed_rows"), self.failed)?;
        for batch in &self.failed_batches {
            let index = (batch.batch_index + 1).to_string();
            let first = batch.first_row.to_string();
            let last = batch.last_row.to_string();
            let count = batch.record_count.to_string();
            writeln!(
                f,
                "    - {}",
                t_in(
                    &self.locale,
                    "report.failed_batch",
                    &[
                        ("index", index.as_str()),
                        ("first", first.as_str()),
                        ("last", last.as_str()),
                        ("count", count.as_str()),
                        ("message", batch.message.as_str()),
                    ],
                )
            )?;
        }
        writeln!(f, "  {}: {} ms", label("report.elapsed"), self.elapsed_ms)
    }
}
