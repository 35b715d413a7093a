// ==========================================
// 会众管理系统 - 人员 Repository 实现
// ==========================================
// 职责: 实现人员/导入历史数据访问（使用 rusqlite）
// 同时实现 PersonWriter: 一个批次 = 一个事务，失败批次不落任何行
// ==========================================

use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use crate::domain::person::{CandidateRecord, ExistingPerson, ImportBatch};
use crate::domain::types::MemberStatus;
use crate::importer::importer_trait::{PersonWriter, WriteError};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::person_repo::PersonRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// PersonRepositoryImpl
// ==========================================
pub struct PersonRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl PersonRepositoryImpl {
    /// 创建新的 Repository 实例（必要时建表）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（与 ConfigManager 共享连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn.lock()?;
            configure_sqlite_connection(&guard)?;
            init_schema(&guard)?;
        }
        Ok(Self { conn })
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在事务中批量插入人员
    fn insert_people_tx(tx: &Transaction, records: &[CandidateRecord]) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO person (
                first_name, last_name, email, phone, address, city, state, zip,
                status, birth_date, join_date, baptism_date, notes, source_row
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14
            )
            "#,
        )?;

        let mut count = 0;
        for record in records {
            let (Some(first_name), Some(last_name)) =
                (record.first_name.as_deref(), record.last_name.as_deref())
            else {
                return Err(RepositoryError::FieldValueError {
                    field: "first_name/last_name".to_string(),
                    message: format!("第 {} 行缺少姓名", record.row_number),
                });
            };

            stmt.execute(params![
                first_name,
                last_name,
                record.email,
                record.phone,
                record.address,
                record.city,
                record.state,
                record.zip,
                record.status.unwrap_or_default().as_str(),
                record.birth_date,
                record.join_date,
                record.baptism_date,
                record.notes,
                record.row_number as i64,
            ])?;
            count += 1;
        }

        Ok(count)
    }

    /// 按状态统计人数
    pub fn count_by_status(&self, status: MemberStatus) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM person WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[async_trait]
impl PersonRepository for PersonRepositoryImpl {
    async fn list_existing_people(&self) -> RepositoryResult<Vec<ExistingPerson>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT person_id, first_name, last_name, email FROM person ORDER BY person_id",
        )?;

        let people = stmt
            .query_map([], |row| {
                Ok(ExistingPerson {
                    id: Some(row.get(0)?),
                    first_name: row.get(1)?,
                    last_name: row.get(2)?,
                    email: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(people)
    }

    async fn insert_people(&self, records: &[CandidateRecord]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let count = Self::insert_people_tx(&tx, records)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(count)
    }

    async fn count_people(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM person", [], |row| row.get(0))?;
        Ok(count)
    }

    async fn insert_import_batch(&self, batch: &ImportBatch) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO import_batch (
                batch_id, file_name, total_rows, valid_rows, duplicate_rows,
                error_rows, success_rows, failed_rows, imported_at, elapsed_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                batch.batch_id,
                batch.file_name,
                batch.total_rows,
                batch.valid_rows,
                batch.duplicate_rows,
                batch.error_rows,
                batch.success_rows,
                batch.failed_rows,
                batch.imported_at,
                batch.elapsed_ms,
            ],
        )?;
        Ok(())
    }

    async fn recent_batches(&self, limit: usize) -> RepositoryResult<Vec<ImportBatch>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT batch_id, file_name, total_rows, valid_rows, duplicate_rows,
                   error_rows, success_rows, failed_rows, imported_at, elapsed_ms
            FROM import_batch
            ORDER BY imported_at DESC
            LIMIT ?1
            "#,
        )?;

        let batches = stmt
            .query_map(params![limit as i64], |row| {
                Ok(ImportBatch {
                    batch_id: row.get(0)?,
                    file_name: row.get(1)?,
                    total_rows: row.get(2)?,
                    valid_rows: row.get(3)?,
                    duplicate_rows: row.get(4)?,
                    error_rows: row.get(5)?,
                    success_rows: row.get(6)?,
                    failed_rows: row.get(7)?,
                    imported_at: row.get::<_, DateTime<Utc>>(8)?,
                    elapsed_ms: row.get(9)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(batches)
    }
}

// ==========================================
// PersonWriter 实现
// ==========================================
#[async_trait]
impl PersonWriter for PersonRepositoryImpl {
    async fn write_batch(&self, records: &[CandidateRecord]) -> Result<(), WriteError> {
        self.insert_people(records).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_repo() -> (NamedTempFile, PersonRepositoryImpl) {
        let temp_file = NamedTempFile::new().unwrap();
        let repo = PersonRepositoryImpl::new(temp_file.path().to_str().unwrap()).unwrap();
        (temp_file, repo)
    }

    fn record(row: usize, first: Option<&str>, last: &str) -> CandidateRecord {
        CandidateRecord {
            first_name: first.map(str::to_string),
            last_name: Some(last.to_string()),
            email: Some(format!("{}@x.com", last.to_lowercase())),
            row_number: row,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let (_temp, repo) = create_repo();
        let inserted = repo
            .insert_people(&[record(2, Some("Jane"), "Doe"), record(3, Some("John"), "Smith")])
            .await
            .unwrap();
        assert_eq!(inserted, 2);

        let people = repo.list_existing_people().await.unwrap();
        assert_eq!(people.len(), 2);
        assert_eq!(people[0].first_name, "Jane");
        assert_eq!(people[0].email.as_deref(), Some("doe@x.com"));
        assert_eq!(repo.count_by_status(MemberStatus::Visitor).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_batch_rolls_back() {
        let (_temp, repo) = create_repo();
        let result = repo
            .insert_people(&[record(2, Some("Jane"), "Doe"), record(3, None, "Smith")])
            .await;

        assert!(matches!(result, Err(RepositoryError::FieldValueError { .. })));
        assert_eq!(repo.count_people().await.unwrap(), 0);
    }
}
