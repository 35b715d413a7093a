// ==========================================
// 会众管理系统 - 数据清洗器实现
// ==========================================
// 阶段 2: 值标准化
// 职责: TRIM / 空值标准化 / 状态标签映射 / 多格式日期解析
// ==========================================

use crate::config::mapping_profile::MappingProfile;
use crate::importer::importer_trait::{DataCleaner as DataCleanerTrait, StatusNormalization};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

/// 主日期格式（按优先级）
const PRIMARY_DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d", "%m-%d-%Y"];

/// 四位年份的下限；%Y 也接受两位年份（"90" → 0090），低于此值视为未匹配
const MIN_FOUR_DIGIT_YEAR: i32 = 1000;

/// 兜底日期格式
const FALLBACK_DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%m/%d/%y"];

pub struct DataCleaner {
    profile: MappingProfile,
}

impl DataCleaner {
    pub fn new(profile: MappingProfile) -> Self {
        Self { profile }
    }
}

impl DataCleanerTrait for DataCleaner {
    fn clean_text(&self, value: &str) -> Option<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    fn normalize_email(&self, value: &str) -> Option<String> {
        self.clean_text(value)
    }

    fn normalize_status(&self, value: &str) -> StatusNormalization {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return StatusNormalization::Empty;
        }

        match self.profile.lookup_status(trimmed) {
            Some(status) => StatusNormalization::Recognized(status),
            None => StatusNormalization::Defaulted {
                raw: trimmed.to_string(),
                status: self.profile.default_status,
            },
        }
    }

    fn parse_date(&self, value: &str) -> Option<NaiveDate> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }

        PRIMARY_DATE_FORMATS
            .iter()
            .chain(FALLBACK_DATE_FORMATS)
            .filter_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
            .find(|date| date.year() >= MIN_FOUR_DIGIT_YEAR)
            .or_else(|| {
                DateTime::parse_from_rfc3339(trimmed)
                    .ok()
                    .map(|dt| dt.date_naive())
            })
            .or_else(|| {
                NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|dt| dt.date())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{MemberStatus, TargetField};
    use std::collections::BTreeMap;

    fn cleaner() -> DataCleaner {
        DataCleaner::new(MappingProfile::planning_center())
    }

    #[test]
    fn test_clean_text() {
        let c = cleaner();
        assert_eq!(c.clean_text("  Jane "), Some("Jane".to_string()));
        assert_eq!(c.clean_text("   "), None);
        assert_eq!(c.normalize_email(" Jane@X.com "), Some("Jane@X.com".to_string()));
    }

    #[test]
    fn test_parse_date_formats() {
        let c = cleaner();
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5);

        assert_eq!(c.parse_date("03/05/2024"), expected);
        assert_eq!(c.parse_date("2024-03-05"), expected);
        assert_eq!(c.parse_date("03-05-2024"), expected);
        assert_eq!(c.parse_date("2024/03/05"), expected);
        assert_eq!(c.parse_date("March 5, 2024"), expected);
        assert_eq!(c.parse_date("Mar 5, 2024"), expected);
        assert_eq!(c.parse_date("2024-03-05T10:00:00Z"), expected);
        assert_eq!(c.parse_date("2024-03-05 10:00:00"), expected);
    }

    #[test]
    fn test_parse_date_two_digit_year() {
        let c = cleaner();
        assert_eq!(c.parse_date("01/02/90"), NaiveDate::from_ymd_opt(1990, 1, 2));
        assert_eq!(c.parse_date("12/31/05"), NaiveDate::from_ymd_opt(2005, 12, 31));
        assert_eq!(c.parse_date("01/02/1990"), NaiveDate::from_ymd_opt(1990, 1, 2));
    }

    #[test]
    fn test_parse_date_unparseable_is_none() {
        let c = cleaner();
        assert_eq!(c.parse_date("sometime last spring"), None);
        assert_eq!(c.parse_date("13/45/2024"), None);
        assert_eq!(c.parse_date(""), None);
    }

    #[test]
    fn test_normalize_status() {
        let c = cleaner();
        assert_eq!(
            c.normalize_status("MEMBER"),
            StatusNormalization::Recognized(MemberStatus::Member)
        );
        assert_eq!(c.normalize_status(" "), StatusNormalization::Empty);
        assert_eq!(
            c.normalize_status("Elder"),
            StatusNormalization::Defaulted {
                raw: "Elder".to_string(),
                status: MemberStatus::Visitor
            }
        );
    }

    #[test]
    fn test_normalize_fields_builds_candidate() {
        let c = cleaner();
        let fields = BTreeMap::from([
            (TargetField::FirstName, "Jane".to_string()),
            (TargetField::LastName, "Doe".to_string()),
            (TargetField::Status, "Deacon".to_string()),
            (TargetField::BirthDate, "01/02/1990".to_string()),
            (TargetField::JoinDate, "not a date".to_string()),
        ]);

        let row = c.normalize_fields(&fields, 7);
        assert_eq!(row.record.row_number, 7);
        assert_eq!(row.record.first_name.as_deref(), Some("Jane"));
        assert_eq!(row.record.status, Some(MemberStatus::Visitor));
        assert_eq!(row.record.birth_date, NaiveDate::from_ymd_opt(1990, 1, 2));
        assert_eq!(row.record.join_date, None);
        assert_eq!(row.unrecognized_status.as_deref(), Some("Deacon"));
    }
}
