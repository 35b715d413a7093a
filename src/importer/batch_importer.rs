// ==========================================
// 会众管理系统 - 分批写入器
// ==========================================
// 阶段 4: 分批提交
// 规则:
// - 按 batch_size 顺序切块，逐块 await，不并发
// - 某块写入失败: 整块计入 failed，记录 FailedBatch，继续下一块
// - 不重试、不回滚已提交的块
// 红线: success + failed == 提交记录数
// ==========================================

use crate::config::import_config_trait::DEFAULT_BATCH_SIZE;
use crate::domain::person::{CandidateRecord, FailedBatch, ImportProgress, ImportResult};
use crate::importer::importer_trait::PersonWriter;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct BatchImporter {
    batch_size: usize,
}

impl Default for BatchImporter {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl BatchImporter {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn total_batches(&self, record_count: usize) -> usize {
        record_count.div_ceil(self.batch_size)
    }

    /// 顺序写入所有记录
    ///
    /// # 参数
    /// - records: 可提交记录（按源顺序）
    /// - writer: 持久化回调
    /// - on_progress: 每块完成后回调（percent 0-100）
    pub async fn run<W, F>(
        &self,
        records: &[CandidateRecord],
        writer: &W,
        mut on_progress: F,
    ) -> ImportResult
    where
        W: PersonWriter + ?Sized,
        F: FnMut(ImportProgress),
    {
        let start = Instant::now();
        let session_id = Uuid::new_v4().to_string();
        let total_batches = self.total_batches(records.len());

        let mut success = 0usize;
        let mut failed = 0usize;
        let mut failed_batches = Vec::new();

        info!(
            session_id = %session_id,
            records = records.len(),
            total_batches,
            batch_size = self.batch_size,
            "开始分批写入"
        );

        for (batch_index, chunk) in records.chunks(self.batch_size).enumerate() {
            match writer.write_batch(chunk).await {
                Ok(()) => {
                    success += chunk.len();
                    debug!(batch_index, count = chunk.len(), "批次写入成功");
                }
                Err(e) => {
                    failed += chunk.len();
                    let first_row = chunk.first().map(|r| r.row_number).unwrap_or_default();
                    let last_row = chunk.last().map(|r| r.row_number).unwrap_or_default();
                    warn!(
                        batch_index,
                        first_row,
                        last_row,
                        count = chunk.len(),
                        error = %e,
                        "批次写入失败，整批计为失败"
                    );
                    failed_batches.push(FailedBatch {
                        batch_index,
                        first_row,
                        last_row,
                        record_count: chunk.len(),
                        message: e.to_string(),
                    });
                }
            }

            let completed_batches = batch_index + 1;
            on_progress(ImportProgress {
                completed_batches,
                total_batches,
                percent: ((completed_batches * 100) / total_batches) as u8,
                success,
                failed,
            });
        }

        if total_batches == 0 {
            on_progress(ImportProgress {
                completed_batches: 0,
                total_batches: 0,
                percent: 100,
                success: 0,
                failed: 0,
            });
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            session_id = %session_id,
            success,
            failed,
            failed_batches = failed_batches.len(),
            elapsed_ms,
            "分批写入完成"
        );

        ImportResult {
            session_id,
            success,
            failed,
            total_batches,
            failed_batches,
            elapsed_ms,
        }
    }
}
