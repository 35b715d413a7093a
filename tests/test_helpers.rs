// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、临时导入文件、可控的 PersonWriter
// ==========================================

#![allow(dead_code)]

use async_trait::async_trait;
use congregation_import::importer::{PersonWriter, WriteError};
use congregation_import::CandidateRecord;
use std::error::Error;
use std::io::Write;
use std::sync::Mutex;
use tempfile::{NamedTempFile, TempPath};

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时路径不是 UTF-8")?
        .to_string();

    let conn = congregation_import::db::open_sqlite_connection(&db_path)?;
    congregation_import::db::init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 写入带扩展名的临时导入文件
pub fn write_import_file(suffix: &str, content: &str) -> Result<TempPath, Box<dyn Error>> {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(file.into_temp_path())
}

/// 生成 n 行有效人员 CSV（邮箱互不相同）
pub fn people_csv(n: usize) -> String {
    let mut csv = String::from("First Name,Last Name,Email,Membership Status\n");
    for i in 0..n {
        csv.push_str(&format!("Person{},Family{},person{}@example.org,Member\n", i, i, i));
    }
    csv
}

// ==========================================
// RecordingWriter - 记录每次写入的批次
// ==========================================
#[derive(Default)]
pub struct RecordingWriter {
    pub batches: Mutex<Vec<Vec<CandidateRecord>>>,
}

impl RecordingWriter {
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches
            .lock()
            .map(|b| b.iter().map(Vec::len).collect())
            .unwrap_or_default()
    }

    pub fn records(&self) -> Vec<CandidateRecord> {
        self.batches
            .lock()
            .map(|b| b.iter().flatten().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PersonWriter for RecordingWriter {
    async fn write_batch(&self, records: &[CandidateRecord]) -> Result<(), WriteError> {
        self.batches
            .lock()
            .map_err(|e| e.to_string())?
            .push(records.to_vec());
        Ok(())
    }
}

// ==========================================
// FailingWriter - 指定批次写入失败
// ==========================================
pub struct FailingWriter {
    fail_on: Vec<usize>,
    calls: Mutex<usize>,
}

impl FailingWriter {
    /// fail_on: 需要失败的批次序号（从 0 开始）
    pub fn new(fail_on: Vec<usize>) -> Self {
        Self {
            fail_on,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().map(|c| *c).unwrap_or_default()
    }
}

#[async_trait]
impl PersonWriter for FailingWriter {
    async fn write_batch(&self, _records: &[CandidateRecord]) -> Result<(), WriteError> {
        let index = {
            let mut calls = self.calls.lock().map_err(|e| e.to_string())?;
            let index = *calls;
            *calls += 1;
            index
        };

        if self.fail_on.contains(&index) {
            return Err(format!("batch {} rejected", index).into());
        }
        Ok(())
    }
}
