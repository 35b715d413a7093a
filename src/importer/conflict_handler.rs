// ==========================================
// 会众管理系统 - 重复检测实现
// ==========================================
// 阶段 3b: 去重提示
// 职责: 与已有人员 / 本文件前面的行比对（邮箱优先，其次全名）
// 策略: 仅标记，不排除（重复记录仍进入提交列表）
// ==========================================

use crate::domain::person::{
    full_name_key, CandidateRecord, DuplicateFlag, DuplicateReason, ExistingPerson,
};
use std::collections::HashSet;

// ==========================================
// ExistingRecordIndex - 已有人员索引
// ==========================================
// 导入开始前一次性构建，之后只读
#[derive(Debug, Clone, Default)]
pub struct ExistingRecordIndex {
    emails: HashSet<String>, // 小写邮箱
    names: HashSet<String>,  // 小写 "first last"
}

impl ExistingRecordIndex {
    pub fn from_people(people: &[ExistingPerson]) -> Self {
        let mut index = Self::default();
        for person in people {
            if let Some(email) = person.email.as_deref() {
                let key = email.trim().to_lowercase();
                if !key.is_empty() {
                    index.emails.insert(key);
                }
            }
            if let Some(name) = full_name_key(&person.first_name, &person.last_name) {
                index.names.insert(name);
            }
        }
        index
    }

    pub fn contains_email(&self, email_key: &str) -> bool {
        self.emails.contains(email_key)
    }

    pub fn contains_name(&self, name_key: &str) -> bool {
        self.names.contains(name_key)
    }

    pub fn email_count(&self) -> usize {
        self.emails.len()
    }

    pub fn name_count(&self) -> usize {
        self.names.len()
    }
}

// ==========================================
// ConflictHandler - 重复检测器
// ==========================================
// 有状态: 记录本文件中已接受的邮箱/姓名
pub struct ConflictHandler {
    index: ExistingRecordIndex,
    seen_emails: HashSet<String>,
    seen_names: HashSet<String>,
}

impl ConflictHandler {
    pub fn new(index: ExistingRecordIndex) -> Self {
        Self {
            index,
            seen_emails: HashSet::new(),
            seen_names: HashSet::new(),
        }
    }

    /// 检测一条已通过校验的记录，并登记为已接受
    ///
    /// # 顺序
    /// 1. 邮箱: 已有人员 → 本文件前面的行
    /// 2. 全名: 已有人员 → 本文件前面的行
    pub fn check(&mut self, record: &CandidateRecord) -> Option<DuplicateFlag> {
        let email_key = record.email_key();
        let name_key = record.full_name_key();

        let flag = |reason: DuplicateReason, key: &str| DuplicateFlag {
            row_number: record.row_number,
            reason,
            matched_key: key.to_string(),
        };

        let result = if let Some(email) = email_key
            .as_deref()
            .filter(|e| self.index.contains_email(e) || self.seen_emails.contains(*e))
        {
            if self.index.contains_email(email) {
                Some(flag(DuplicateReason::ExistingEmail, email))
            } else {
                Some(flag(DuplicateReason::InFileEmail, email))
            }
        } else if let Some(name) = name_key
            .as_deref()
            .filter(|n| self.index.contains_name(n) || self.seen_names.contains(*n))
        {
            if self.index.contains_name(name) {
                Some(flag(DuplicateReason::ExistingName, name))
            } else {
                Some(flag(DuplicateReason::InFileName, name))
            }
        } else {
            None
        };

        if let Some(email) = email_key {
            self.seen_emails.insert(email);
        }
        if let Some(name) = name_key {
            self.seen_names.insert(name);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn existing(first: &str, last: &str, email: Option<&str>) -> ExistingPerson {
        ExistingPerson {
            id: None,
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: email.map(str::to_string),
        }
    }

    fn candidate(row: usize, first: &str, last: &str, email: Option<&str>) -> CandidateRecord {
        CandidateRecord {
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            email: email.map(str::to_string),
            row_number: row,
            ..Default::default()
        }
    }

    #[test]
    fn test_existing_email_case_insensitive() {
        let index = ExistingRecordIndex::from_people(&[existing("Ann", "Lee", Some("a@b.com"))]);
        let mut handler = ConflictHandler::new(index);

        let flag = handler
            .check(&candidate(2, "Other", "Person", Some("A@B.COM")))
            .unwrap();
        assert_eq!(flag.reason, DuplicateReason::ExistingEmail);
        assert_eq!(flag.matched_key, "a@b.com");
    }

    #[test]
    fn test_existing_name_without_email() {
        let index = ExistingRecordIndex::from_people(&[existing("Jane", "Doe", None)]);
        let mut handler = ConflictHandler::new(index);

        let flag = handler.check(&candidate(2, "JANE", "doe", None)).unwrap();
        assert_eq!(flag.reason, DuplicateReason::ExistingName);
        assert_eq!(flag.matched_key, "jane doe");
    }

    #[test]
    fn test_in_file_duplicates() {
        let mut handler = ConflictHandler::new(ExistingRecordIndex::default());

        assert!(handler.check(&candidate(2, "Jane", "Doe", Some("jane@x.com"))).is_none());
        let flag = handler
            .check(&candidate(4, "Janet", "Doe", Some("Jane@X.com")))
            .unwrap();
        assert_eq!(flag.reason, DuplicateReason::InFileEmail);
        assert_eq!(flag.row_number, 4);

        let flag = handler.check(&candidate(5, "Jane", "Doe", None)).unwrap();
        assert_eq!(flag.reason, DuplicateReason::InFileName);
    }

    #[test]
    fn test_index_skips_blank_keys() {
        let index = ExistingRecordIndex::from_people(&[
            existing("", "Doe", Some("  ")),
            existing("Jane", "Doe", Some("jane@x.com")),
        ]);
        assert_eq!(index.email_count(), 1);
        assert_eq!(index.name_count(), 1);
    }
}
