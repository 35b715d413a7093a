// ==========================================
// 会众管理系统 - 导入会话状态机
// ==========================================
// 阶段: upload → mapping → preview → importing → complete
// 规则:
// - 非法迁移返回 InvalidTransition，状态保持不变
// - 上传/解析失败停留在 upload
// - reset() 可从任意状态回到 upload
// - commit 持有 &mut self，导入期间不可重入
// ==========================================

use crate::domain::person::{
    FieldMapping, ImportPreview, ImportProgress, ImportResult, ParsedFile,
};
use crate::domain::types::ImportStage;
use crate::importer::conflict_handler::ExistingRecordIndex;
use crate::importer::error::{ImportError, PipelineResult};
use crate::importer::importer_trait::PersonWriter;
use crate::importer::person_importer::PersonImporter;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub enum ImportSession {
    #[default]
    Upload,
    Mapping {
        file_name: Option<String>,
        file: ParsedFile,
        mappings: Vec<FieldMapping>,
    },
    Preview {
        file_name: Option<String>,
        file: ParsedFile,
        mappings: Vec<FieldMapping>,
        preview: ImportPreview,
    },
    Importing {
        file_name: Option<String>,
        record_count: usize,
    },
    Complete {
        file_name: Option<String>,
        preview: ImportPreview,
        result: ImportResult,
    },
}

impl ImportSession {
    pub fn new() -> Self {
        Self::Upload
    }

    pub fn stage(&self) -> ImportStage {
        match self {
            ImportSession::Upload => ImportStage::Upload,
            ImportSession::Mapping { .. } => ImportStage::Mapping,
            ImportSession::Preview { .. } => ImportStage::Preview,
            ImportSession::Importing { .. } => ImportStage::Importing,
            ImportSession::Complete { .. } => ImportStage::Complete,
        }
    }

    fn invalid(&self, action: &'static str) -> ImportError {
        ImportError::InvalidTransition {
            stage: self.stage(),
            action,
        }
    }

    // ===== 查询 =====

    pub fn file_name(&self) -> Option<&str> {
        match self {
            ImportSession::Upload => None,
            ImportSession::Mapping { file_name, .. }
            | ImportSession::Preview { file_name, .. }
            | ImportSession::Importing { file_name, .. }
            | ImportSession::Complete { file_name, .. } => file_name.as_deref(),
        }
    }

    pub fn mappings(&self) -> Option<&[FieldMapping]> {
        match self {
            ImportSession::Mapping { mappings, .. } | ImportSession::Preview { mappings, .. } => {
                Some(mappings)
            }
            _ => None,
        }
    }

    pub fn preview(&self) -> Option<&ImportPreview> {
        match self {
            ImportSession::Preview { preview, .. } | ImportSession::Complete { preview, .. } => {
                Some(preview)
            }
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&ImportResult> {
        match self {
            ImportSession::Complete { result, .. } => Some(result),
            _ => None,
        }
    }

    // ===== 迁移 =====

    /// upload → mapping（内存内容）
    pub fn upload(
        &mut self,
        importer: &PersonImporter,
        file_name: Option<String>,
        bytes: &[u8],
    ) -> PipelineResult<()> {
        if !matches!(self, ImportSession::Upload) {
            return Err(self.invalid("upload"));
        }

        let file = importer.parse_bytes(file_name.as_deref(), bytes)?;
        let mappings = importer.auto_map(&file.headers);
        info!(
            file_name = file_name.as_deref().unwrap_or("-"),
            rows = file.rows.len(),
            "文件已上传，进入映射阶段"
        );

        *self = ImportSession::Mapping {
            file_name,
            file,
            mappings,
        };
        Ok(())
    }

    /// upload → mapping（读取文件）
    pub fn upload_path(&mut self, importer: &PersonImporter, path: &Path) -> PipelineResult<()> {
        if !matches!(self, ImportSession::Upload) {
            return Err(self.invalid("upload"));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string());
        let bytes = std::fs::read(path)?;
        self.upload(importer, file_name, &bytes)
    }

    /// mapping 阶段替换映射
    pub fn update_mapping(&mut self, new_mappings: Vec<FieldMapping>) -> PipelineResult<()> {
        match self {
            ImportSession::Mapping { mappings, .. } => {
                *mappings = new_mappings;
                Ok(())
            }
            _ => Err(self.invalid("update_mapping")),
        }
    }

    /// mapping → preview
    pub fn generate_preview(
        &mut self,
        importer: &PersonImporter,
        index: &ExistingRecordIndex,
    ) -> PipelineResult<&ImportPreview> {
        let ImportSession::Mapping { file, mappings, .. } = &*self else {
            return Err(self.invalid("generate_preview"));
        };

        let preview = importer.generate_preview(file, mappings, index)?;

        let ImportSession::Mapping {
            file_name,
            file,
            mappings,
        } = std::mem::take(self)
        else {
            return Err(ImportError::InternalError("会话状态在预览期间改变".to_string()));
        };

        *self = ImportSession::Preview {
            file_name,
            file,
            mappings,
            preview,
        };

        match &*self {
            ImportSession::Preview { preview, .. } => Ok(preview),
            _ => Err(ImportError::InternalError("预览未保存".to_string())),
        }
    }

    /// preview → mapping
    pub fn back_to_mapping(&mut self) -> PipelineResult<()> {
        match std::mem::take(self) {
            ImportSession::Preview {
                file_name,
                file,
                mappings,
                ..
            } => {
                *self = ImportSession::Mapping {
                    file_name,
                    file,
                    mappings,
                };
                Ok(())
            }
            other => {
                *self = other;
                Err(self.invalid("back_to_mapping"))
            }
        }
    }

    /// preview → importing → complete
    ///
    /// 批次失败不会使 commit 失败，只计入结果
    pub async fn commit<W, F>(
        &mut self,
        importer: &PersonImporter,
        writer: &W,
        on_progress: F,
    ) -> PipelineResult<ImportResult>
    where
        W: PersonWriter + ?Sized,
        F: FnMut(ImportProgress),
    {
        let (file_name, preview) = match std::mem::take(self) {
            ImportSession::Preview {
                file_name, preview, ..
            } => (file_name, preview),
            other => {
                *self = other;
                return Err(self.invalid("commit"));
            }
        };

        *self = ImportSession::Importing {
            file_name: file_name.clone(),
            record_count: preview.records.len(),
        };

        let result = importer.run_import(&preview, writer, on_progress).await;
        if result.failed > 0 {
            warn!(
                failed = result.failed,
                failed_batches = result.failed_batches.len(),
                "导入完成，部分批次写入失败"
            );
        }

        *self = ImportSession::Complete {
            file_name,
            preview,
            result: result.clone(),
        };
        Ok(result)
    }

    /// 任意状态 → upload
    pub fn reset(&mut self) {
        *self = ImportSession::Upload;
    }
}
