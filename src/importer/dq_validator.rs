// ==========================================
// 会众管理系统 - 数据质量校验器实现
// ==========================================
// 阶段 3a: 行级校验
// 职责: 姓名必填校验；严格模式下未识别状态视为错误
// 输出: 本地化的行级错误文本（不阻断其他行）
// ==========================================

use crate::i18n::t_in;
use crate::importer::importer_trait::NormalizedRow;

pub struct DqValidator {
    locale: String,
    strict: bool,
}

impl DqValidator {
    pub fn new(locale: impl Into<String>, strict: bool) -> Self {
        Self {
            locale: locale.into(),
            strict,
        }
    }

    /// 校验单行
    ///
    /// # 返回
    /// - None: 通过
    /// - Some(message): 行级错误（该行不进入提交列表）
    pub fn validate(&self, row: &NormalizedRow) -> Option<String> {
        let row_number = row.record.row_number.to_string();

        if !row.record.has_full_name() {
            return Some(t_in(
                &self.locale,
                "import.missing_name",
                &[("row", row_number.as_str())],
            ));
        }

        if self.strict {
            if let Some(raw) = &row.unrecognized_status {
                return Some(t_in(
                    &self.locale,
                    "import.unknown_status",
                    &[("row", row_number.as_str()), ("value", raw.as_str())],
                ));
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::person::CandidateRecord;

    fn row(first: Option<&str>, last: Option<&str>, unrecognized: Option<&str>) -> NormalizedRow {
        NormalizedRow {
            record: CandidateRecord {
                first_name: first.map(str::to_string),
                last_name: last.map(str::to_string),
                row_number: 3,
                ..Default::default()
            },
            unrecognized_status: unrecognized.map(str::to_string),
        }
    }

    #[test]
    fn test_missing_name_message() {
        let validator = DqValidator::new("en", false);
        assert_eq!(
            validator.validate(&row(None, Some("Smith"), None)),
            Some("Row 3: Missing first or last name".to_string())
        );
        assert!(validator.validate(&row(Some("Jane"), None, None)).is_some());
        assert!(validator.validate(&row(Some("Jane"), Some("Doe"), None)).is_none());
    }

    #[test]
    fn test_unknown_status_only_fails_in_strict_mode() {
        let lenient = DqValidator::new("en", false);
        let strict = DqValidator::new("en", true);
        let r = row(Some("Jane"), Some("Doe"), Some("Elder"));

        assert!(lenient.validate(&r).is_none());
        let msg = strict.validate(&r).unwrap();
        assert!(msg.contains("Row 3"));
        assert!(msg.contains("Elder"));
    }
}
