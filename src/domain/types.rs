// ==========================================
// 会众管理系统 - 领域类型定义
// ==========================================
// 职责: 会众状态、目标字段、导入阶段等枚举
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 会众状态 (Member Status)
// ==========================================
// 未识别的状态标签统一回落到 Visitor（权限最低的类别）
// 序列化格式: snake_case (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Member,          // 正式会友
    RegularAttender, // 固定聚会者
    #[default]
    Visitor,         // 访客
    Inactive,        // 不活跃
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Member => "member",
            MemberStatus::RegularAttender => "regular_attender",
            MemberStatus::Visitor => "visitor",
            MemberStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MemberStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "member" => Ok(MemberStatus::Member),
            "regular_attender" => Ok(MemberStatus::RegularAttender),
            "visitor" => Ok(MemberStatus::Visitor),
            "inactive" => Ok(MemberStatus::Inactive),
            other => Err(format!("未知的会众状态: {}", other)),
        }
    }
}

// ==========================================
// 目标字段 (Target Field)
// ==========================================
// 源列映射到的人员字段；Skip 表示该列不导入
// 序列化格式: camelCase（与映射配置 JSON 一致）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum TargetField {
    FirstName,
    LastName,
    Email,
    Phone,
    Address,
    City,
    State,
    Zip,
    Status,
    BirthDate,
    JoinDate,
    BaptismDate,
    Notes,
    Skip,
}

impl TargetField {
    /// 所有可导入字段（不含 Skip）
    pub const ALL: [TargetField; 13] = [
        TargetField::FirstName,
        TargetField::LastName,
        TargetField::Email,
        TargetField::Phone,
        TargetField::Address,
        TargetField::City,
        TargetField::State,
        TargetField::Zip,
        TargetField::Status,
        TargetField::BirthDate,
        TargetField::JoinDate,
        TargetField::BaptismDate,
        TargetField::Notes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetField::FirstName => "firstName",
            TargetField::LastName => "lastName",
            TargetField::Email => "email",
            TargetField::Phone => "phone",
            TargetField::Address => "address",
            TargetField::City => "city",
            TargetField::State => "state",
            TargetField::Zip => "zip",
            TargetField::Status => "status",
            TargetField::BirthDate => "birthDate",
            TargetField::JoinDate => "joinDate",
            TargetField::BaptismDate => "baptismDate",
            TargetField::Notes => "notes",
            TargetField::Skip => "skip",
        }
    }

    /// 是否为日期字段（需走日期解析）
    pub fn is_date(&self) -> bool {
        matches!(
            self,
            TargetField::BirthDate | TargetField::JoinDate | TargetField::BaptismDate
        )
    }
}

impl fmt::Display for TargetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TargetField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed == "skip" {
            return Ok(TargetField::Skip);
        }
        TargetField::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == trimmed)
            .ok_or_else(|| format!("未知的目标字段: {}", trimmed))
    }
}

// ==========================================
// 导入阶段 (Import Stage)
// ==========================================
// upload → mapping → preview → importing → complete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStage {
    Upload,
    Mapping,
    Preview,
    Importing,
    Complete,
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportStage::Upload => write!(f, "upload"),
            ImportStage::Mapping => write!(f, "mapping"),
            ImportStage::Preview => write!(f, "preview"),
            ImportStage::Importing => write!(f, "importing"),
            ImportStage::Complete => write!(f, "complete"),
        }
    }
}

// ==========================================
// 源文件格式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Csv,
    Json,
    Excel,
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Csv => write!(f, "CSV"),
            SourceFormat::Json => write!(f, "JSON"),
            SourceFormat::Excel => write!(f, "XLSX"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_status_default_is_visitor() {
        assert_eq!(MemberStatus::default(), MemberStatus::Visitor);
    }

    #[test]
    fn test_member_status_from_str() {
        assert_eq!(
            "Regular_Attender".parse::<MemberStatus>().unwrap(),
            MemberStatus::RegularAttender
        );
        assert!("elder".parse::<MemberStatus>().is_err());
    }

    #[test]
    fn test_target_field_parses_own_names() {
        for field in TargetField::ALL {
            assert_eq!(field.as_str().parse::<TargetField>().unwrap(), field);
        }
        assert_eq!("skip".parse::<TargetField>().unwrap(), TargetField::Skip);
    }

    #[test]
    fn test_target_field_serde_camel_case() {
        let json = serde_json::to_string(&TargetField::BirthDate).unwrap();
        assert_eq!(json, "\"birthDate\"");
    }
}
