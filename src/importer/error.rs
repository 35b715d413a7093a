// ==========================================
// 会众管理系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 行级校验错误不在此处（收集为预览中的错误文本）
// ==========================================

use crate::domain::types::ImportStage;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .csv/.json/.xlsx）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("JSON 解析失败: {0}")]
    JsonParseError(String),

    // ===== 文件结构错误 =====
    #[error("文件格式错误: {0}")]
    FormatError(String),

    #[error("列数不符 (行 {row}): 期望 {expected} 列，实际 {found} 列")]
    ColumnCountMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    // ===== 映射错误 =====
    #[error("字段映射冲突: {target} 同时由 [{sources}] 映射")]
    MappingConflict { target: String, sources: String },

    #[error("源列不存在: {0}")]
    UnknownColumn(String),

    // ===== 会话状态错误 =====
    #[error("当前阶段 {stage} 不允许执行 {action}")]
    InvalidTransition {
        stage: ImportStage,
        action: &'static str,
    },

    // ===== 配置错误 =====
    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },

    // ===== 仓储错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 是否为文件结构类错误（会话应停留在 upload 阶段）
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            ImportError::FormatError(_)
                | ImportError::ColumnCountMismatch { .. }
                | ImportError::CsvParseError(_)
                | ImportError::JsonParseError(_)
                | ImportError::ExcelParseError(_)
                | ImportError::UnsupportedFormat(_)
        )
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            ImportError::FileNotFound(err.to_string())
        } else {
            ImportError::FileReadError(err.to_string())
        }
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::JsonParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type PipelineResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_not_found_maps_to_file_not_found() {
        let err: ImportError = std::io::Error::new(std::io::ErrorKind::NotFound, "x").into();
        assert!(matches!(err, ImportError::FileNotFound(_)));
    }

    #[test]
    fn test_format_error_classification() {
        assert!(ImportError::FormatError("空文件".to_string()).is_format_error());
        assert!(!ImportError::InternalError("x".to_string()).is_format_error());
    }

    #[test]
    fn test_column_mismatch_message() {
        let err = ImportError::ColumnCountMismatch {
            row: 4,
            expected: 3,
            found: 2,
        };
        assert!(err.to_string().contains("行 4"));
    }
}
