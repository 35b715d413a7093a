// ==========================================
// 会众管理系统 - 人员导入编排器
// ==========================================
// 职责: 串联导入管道各阶段
// 流程:
//   0. 文件解析（CSV / JSON / Excel）
//   1. 字段映射（自动 + 用户覆写）
//   2. 值标准化
//   3. 行级校验 + 去重提示 → ImportPreview
//   4. 分批写入 → ImportResult
// ==========================================

use crate::config::import_config_trait::{ImportConfigReader, ImportOptions};
use crate::domain::person::{
    ExistingPerson, FieldMapping, ImportPreview, ImportProgress, ImportResult, ParsedFile,
};
use crate::domain::types::SourceFormat;
use crate::importer::batch_importer::BatchImporter;
use crate::importer::conflict_handler::{ConflictHandler, ExistingRecordIndex};
use crate::importer::data_cleaner::DataCleaner as DataCleanerImpl;
use crate::importer::dq_validator::DqValidator;
use crate::importer::error::{ImportError, PipelineResult};
use crate::importer::field_mapper::FieldMapper as FieldMapperImpl;
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::importer_trait::{DataCleaner, FieldMapper, PersonWriter};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

// ==========================================
// ImportOutcome - 非交互式导入的完整产物
// ==========================================
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub parsed_format: SourceFormat,
    pub mappings: Vec<FieldMapping>,
    pub preview: ImportPreview,
    pub result: ImportResult,
}

// ==========================================
// PersonImporter - 导入编排器
// ==========================================
pub struct PersonImporter {
    options: ImportOptions,
    parser: UniversalFileParser,
    mapper: FieldMapperImpl,
    cleaner: DataCleanerImpl,
    validator: DqValidator,
    batch_importer: BatchImporter,
}

impl PersonImporter {
    pub fn new(options: ImportOptions) -> Self {
        Self {
            parser: UniversalFileParser::new(options.strict),
            mapper: FieldMapperImpl::new(options.profile.clone()),
            cleaner: DataCleanerImpl::new(options.profile.clone()),
            validator: DqValidator::new(options.locale.clone(), options.strict),
            batch_importer: BatchImporter::new(options.batch_size),
            options,
        }
    }

    /// 从配置读取器加载选项并创建
    pub async fn from_config<C: ImportConfigReader + ?Sized>(config: &C) -> PipelineResult<Self> {
        let options = ImportOptions::from_config(config)
            .await
            .map_err(|e| ImportError::ConfigReadError {
                key: "import_options".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self::new(options))
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    // ===== 阶段 0: 解析 =====

    pub fn parse_path(&self, path: &Path) -> PipelineResult<ParsedFile> {
        self.parser.parse_path(path)
    }

    /// 解析内存中的文件内容（file_name 用于按扩展名判断格式）
    pub fn parse_bytes(&self, file_name: Option<&str>, bytes: &[u8]) -> PipelineResult<ParsedFile> {
        let format = UniversalFileParser::detect_format(file_name.map(Path::new), bytes)?;
        self.parser.parse_as(format, bytes)
    }

    // ===== 阶段 1: 映射 =====

    pub fn auto_map(&self, headers: &[String]) -> Vec<FieldMapping> {
        self.mapper.auto_map(headers)
    }

    pub fn apply_overrides(
        &self,
        mappings: Vec<FieldMapping>,
        overrides: &[FieldMapping],
    ) -> PipelineResult<Vec<FieldMapping>> {
        self.mapper.apply_overrides(mappings, overrides)
    }

    // ===== 阶段 2-3: 标准化 + 校验 + 去重 =====

    /// 生成导入预览
    ///
    /// # 说明
    /// - 每行: 映射 → 标准化 → 姓名校验 → 去重（重复仍可提交）
    /// - 严格模式: 映射必须单射，未识别状态计为行错误
    /// - 确定性: 相同输入得到相同输出，不做 I/O
    pub fn generate_preview(
        &self,
        file: &ParsedFile,
        mappings: &[FieldMapping],
        index: &ExistingRecordIndex,
    ) -> PipelineResult<ImportPreview> {
        if self.options.strict {
            self.mapper.ensure_injective(mappings)?;
        }

        let mut handler = ConflictHandler::new(index.clone());
        let mut preview = ImportPreview {
            total_rows: file.rows.len(),
            skipped_rows: file.skipped_rows.len(),
            ..Default::default()
        };

        for raw in &file.rows {
            let fields = self.mapper.project(raw, mappings);
            let normalized = self.cleaner.normalize_fields(&fields, raw.row_number);

            if let Some(message) = self.validator.validate(&normalized) {
                debug!(row = raw.row_number, %message, "行校验失败");
                preview.errors.push(message);
                continue;
            }

            if normalized.unrecognized_status.is_some() {
                preview.coerced_statuses += 1;
            }

            if let Some(flag) = handler.check(&normalized.record) {
                preview.duplicate_count += 1;
                preview.duplicates.push(flag);
            }

            preview.records.push(normalized.record);
        }

        preview.valid_count = preview.records.len();

        if preview.coerced_statuses > 0 {
            warn!(
                count = preview.coerced_statuses,
                default_status = %self.options.profile.default_status,
                "存在未识别的状态标签，已回落到默认状态"
            );
        }
        info!(
            total = preview.total_rows,
            valid = preview.valid_count,
            duplicates = preview.duplicate_count,
            errors = preview.error_count(),
            skipped = preview.skipped_rows,
            "预览生成完成"
        );

        Ok(preview)
    }

    // ===== 阶段 4: 分批写入 =====

    pub async fn run_import<W, F>(
        &self,
        preview: &ImportPreview,
        writer: &W,
        on_progress: F,
    ) -> ImportResult
    where
        W: PersonWriter + ?Sized,
        F: FnMut(ImportProgress),
    {
        self.batch_importer
            .run(&preview.records, writer, on_progress)
            .await
    }

    // ===== 非交互式完整流程 =====

    /// 自动映射并导入整个文件
    pub async fn import_file<W>(
        &self,
        path: &Path,
        existing: &[ExistingPerson],
        writer: &W,
    ) -> PipelineResult<ImportOutcome>
    where
        W: PersonWriter + ?Sized,
    {
        self.import_file_with_mapping(path, &[], existing, writer)
            .await
    }

    /// 自动映射 + 用户覆写后导入整个文件
    #[instrument(skip_all, fields(path = %path.display(), strict = self.options.strict))]
    pub async fn import_file_with_mapping<W>(
        &self,
        path: &Path,
        overrides: &[FieldMapping],
        existing: &[ExistingPerson],
        writer: &W,
    ) -> PipelineResult<ImportOutcome>
    where
        W: PersonWriter + ?Sized,
    {
        // 步骤 1: 解析文件
        debug!("步骤 1: 解析文件");
        let parsed = self.parse_path(path).map_err(|e| {
            tracing::error!(error = %e, "文件解析失败");
            e
        })?;
        info!(
            format = %parsed.format,
            headers = parsed.headers.len(),
            rows = parsed.rows.len(),
            skipped = parsed.skipped_rows.len(),
            "文件解析完成"
        );

        // 步骤 2: 字段映射
        debug!("步骤 2: 字段映射");
        let mappings = self.apply_overrides(self.auto_map(&parsed.headers), overrides)?;

        // 步骤 3: 构建去重索引 + 预览
        debug!("步骤 3: 校验与去重");
        let index = ExistingRecordIndex::from_people(existing);
        let preview = self.generate_preview(&parsed, &mappings, &index)?;

        // 步骤 4: 分批写入
        debug!("步骤 4: 分批写入");
        let result = self
            .run_import(&preview, writer, |p| {
                debug!(percent = p.percent, success = p.success, failed = p.failed, "导入进度");
            })
            .await;

        Ok(ImportOutcome {
            parsed_format: parsed.format,
            mappings,
            preview,
            result,
        })
    }
}
