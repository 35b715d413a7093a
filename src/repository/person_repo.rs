// ==========================================
// 会众管理系统 - 人员 Repository Trait
// ==========================================
// 职责: 定义人员/导入历史数据访问接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::person::{CandidateRecord, ExistingPerson, ImportBatch};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// PersonRepository Trait
// ==========================================
// 实现者: PersonRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait PersonRepository: Send + Sync {
    // ===== 人员 =====

    /// 加载已有人员快照（用于构建去重索引）
    async fn list_existing_people(&self) -> RepositoryResult<Vec<ExistingPerson>>;

    /// 批量插入人员（单个事务）
    ///
    /// # 返回
    /// - Ok(usize): 插入的记录数
    /// - Err: 数据库错误（整个事务回滚）
    async fn insert_people(&self, records: &[CandidateRecord]) -> RepositoryResult<usize>;

    /// 人员总数
    async fn count_people(&self) -> RepositoryResult<i64>;

    // ===== 导入历史 =====

    /// 写入一次导入会话的汇总
    async fn insert_import_batch(&self, batch: &ImportBatch) -> RepositoryResult<()>;

    /// 最近的导入会话（按时间倒序）
    async fn recent_batches(&self, limit: usize) -> RepositoryResult<Vec<ImportBatch>>;
}
