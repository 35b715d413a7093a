// ==========================================
// 会众管理系统 - 人员导入命令行入口
// ==========================================
// 子命令:
// - preview: 解析 + 映射 + 校验，只输出报告，不写库
// - import:  预览后分批写入 person 表，并记录导入历史
// - config:  查看/修改 config_kv 中的导入配置
// - history: 最近的导入会话
// ==========================================

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use congregation_import::config::{ConfigManager, ImportOptions};
use congregation_import::db::{get_default_db_path, open_sqlite_connection};
use congregation_import::importer::{
    CompletionReport, ExistingRecordIndex, ImportReport, ImportSession, PersonImporter,
    DEFAULT_MAX_ERRORS,
};
use congregation_import::repository::{PersonRepository, PersonRepositoryImpl};
use congregation_import::{logging, FieldMapping, ImportBatch, TargetField, APP_NAME, VERSION};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Command-line arguments for congregation-import
#[derive(Parser, Debug)]
#[command(name = "congregation-import")]
#[command(about = "Import people into the congregation database from CSV, JSON or Excel exports")]
#[command(version)]
struct Cli {
    /// SQLite database file (defaults to CONGREGATION_IMPORT_DB_PATH or the user data dir)
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse, map and validate a file without writing anything
    Preview {
        file: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Number of row errors to list
        #[arg(long, default_value_t = DEFAULT_MAX_ERRORS)]
        max_errors: usize,
    },

    /// Preview and then write valid rows in batches
    Import {
        file: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Records per write batch (overrides the stored setting)
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Show or change stored import settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// List recent import sessions
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct PipelineArgs {
    /// Column override, e.g. --map "Nick Name=notes" (repeatable)
    #[arg(long = "map", value_name = "HEADER=FIELD", value_parser = parse_mapping)]
    mappings: Vec<FieldMapping>,

    /// Treat column-count mismatches, unknown statuses and mapping conflicts as errors
    #[arg(long)]
    strict: bool,

    /// Language for row messages (en, zh-CN)
    #[arg(long)]
    locale: Option<String>,

    /// Print machine-readable JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print all stored settings as JSON
    Show,
    /// Validate and store a setting
    Set { key: String, value: String },
}

/// 解析 "列名=目标字段"（以最后一个 '=' 分隔，列名可含 '='）
fn parse_mapping(s: &str) -> Result<FieldMapping, String> {
    let (source, target) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected HEADER=FIELD, got '{}'", s))?;
    if source.trim().is_empty() {
        return Err(format!("empty column name in '{}'", s));
    }
    let target: TargetField = target.parse()?;
    Ok(FieldMapping::new(source.trim(), target))
}

// ==========================================
// 应用上下文（共享一个 SQLite 连接）
// ==========================================
struct AppContext {
    config: ConfigManager,
    repo: PersonRepositoryImpl,
}

impl AppContext {
    fn open(db_path: &str) -> Result<Self> {
        let conn = open_sqlite_connection(db_path)
            .with_context(|| format!("无法打开数据库: {}", db_path))?;
        let conn = Arc::new(Mutex::new(conn));

        // 仓储负责建表，需先于配置读取
        let repo = PersonRepositoryImpl::from_connection(conn.clone())?;
        let config = ConfigManager::from_connection(conn).map_err(|e| anyhow!(e))?;
        Ok(Self { config, repo })
    }

    async fn importer(&self, pipeline: &PipelineArgs, batch_size: Option<usize>) -> Result<PersonImporter> {
        let mut options = ImportOptions::from_config(&self.config)
            .await
            .map_err(|e| anyhow!(e))?;
        if pipeline.strict {
            options = options.with_strict(true);
        }
        if let Some(locale) = &pipeline.locale {
            options = options.with_locale(locale.clone());
        }
        if let Some(batch_size) = batch_size {
            options = options.with_batch_size(batch_size);
        }
        debug!(
            batch_size = options.batch_size,
            strict = options.strict,
            locale = %options.locale,
            "导入选项已加载"
        );
        Ok(PersonImporter::new(options))
    }

    /// upload → mapping（含用户覆写）→ preview
    async fn prepare_session(
        &self,
        importer: &PersonImporter,
        file: &Path,
        overrides: &[FieldMapping],
    ) -> Result<ImportSession> {
        let mut session = ImportSession::new();
        session.upload_path(importer, file)?;

        if !overrides.is_empty() {
            let current = session.mappings().map(<[_]>::to_vec).unwrap_or_default();
            let merged = importer.apply_overrides(current, overrides)?;
            session.update_mapping(merged)?;
        }
        for mapping in session.mappings().unwrap_or_default() {
            debug!(source = %mapping.source, target = %mapping.target, "字段映射");
        }

        let existing = self.repo.list_existing_people().await?;
        let index = ExistingRecordIndex::from_people(&existing);
        info!(
            existing = existing.len(),
            emails = index.email_count(),
            names = index.name_count(),
            "去重索引已构建"
        );

        session.generate_preview(importer, &index)?;
        Ok(session)
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_preview(
    ctx: &AppContext,
    file: &Path,
    pipeline: &PipelineArgs,
    max_errors: usize,
) -> Result<()> {
    let importer = ctx.importer(pipeline, None).await?;
    let session = ctx.prepare_session(&importer, file, &pipeline.mappings).await?;
    let preview = session
        .preview()
        .ok_or_else(|| anyhow!("预览未生成"))?;

    let report = ImportReport::from_preview(preview, max_errors)
        .with_locale(importer.options().locale.clone());
    if pipeline.json {
        print_json(&report)
    } else {
        print!("{}", report);
        Ok(())
    }
}

async fn run_import(
    ctx: &AppContext,
    file: &Path,
    pipeline: &PipelineArgs,
    batch_size: Option<usize>,
) -> Result<()> {
    let importer = ctx.importer(pipeline, batch_size).await?;
    let locale = importer.options().locale.clone();
    let mut session = ctx.prepare_session(&importer, file, &pipeline.mappings).await?;

    let preview = session
        .preview()
        .cloned()
        .ok_or_else(|| anyhow!("预览未生成"))?;
    let preview_report =
        ImportReport::from_preview(&preview, DEFAULT_MAX_ERRORS).with_locale(locale.clone());
    if !pipeline.json {
        print!("{}", preview_report);
    }

    let result = session
        .commit(&importer, &ctx.repo, |progress| {
            info!(
                batch = progress.completed_batches,
                total = progress.total_batches,
                percent = progress.percent,
                success = progress.success,
                failed = progress.failed,
                "导入进度"
            );
        })
        .await?;

    let history = ImportBatch::from_outcome(
        session.file_name().map(str::to_string),
        &preview,
        &result,
    );
    ctx.repo.insert_import_batch(&history).await?;

    let completion = CompletionReport::from_result(&result).with_locale(locale);
    if pipeline.json {
        print_json(&serde_json::json!({
            "preview": preview_report,
            "result": completion,
        }))?;
    } else {
        print!("{}", completion);
    }

    if result.failed > 0 {
        anyhow::bail!(
            "{} of {} records failed to import",
            result.failed,
            result.success + result.failed
        );
    }
    Ok(())
}

fn run_config(ctx: &AppContext, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let snapshot = ctx.config.get_config_snapshot().map_err(|e| anyhow!(e))?;
            println!("{}", snapshot);
        }
        ConfigAction::Set { key, value } => {
            ctx.config
                .set_import_config(key, value)
                .map_err(|e| anyhow!(e))?;
            println!("{} = {}", key, value.trim());
        }
    }
    Ok(())
}

async fn run_history(ctx: &AppContext, limit: usize, json: bool) -> Result<()> {
    let batches = ctx.repo.recent_batches(limit).await?;
    if json {
        return print_json(&batches);
    }

    if batches.is_empty() {
        println!("No imports recorded yet");
        return Ok(());
    }
    for batch in &batches {
        println!(
            "{}  {:<24} total={} valid={} dup={} err={} ok={} failed={} ({} ms)",
            batch.imported_at.format("%Y-%m-%d %H:%M:%S"),
            batch.file_name.as_deref().unwrap_or("-"),
            batch.total_rows,
            batch.valid_rows,
            batch.duplicate_rows,
            batch.error_rows,
            batch.success_rows,
            batch.failed_rows,
            batch.elapsed_ms,
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_from_env();

    let cli = Cli::parse();
    let db_path = cli.db.clone().unwrap_or_else(get_default_db_path);

    info!("{} v{}", APP_NAME, VERSION);
    info!(db_path = %db_path, "使用数据库");

    let ctx = AppContext::open(&db_path)?;

    match &cli.command {
        Command::Preview {
            file,
            pipeline,
            max_errors,
        } => run_preview(&ctx, file, pipeline, *max_errors).await,
        Command::Import {
            file,
            pipeline,
            batch_size,
        } => run_import(&ctx, file, pipeline, *batch_size).await,
        Command::Config { action } => run_config(&ctx, action),
        Command::History { limit, json } => run_history(&ctx, *limit, *json).await,
    }
}
