// ==========================================
// 会众管理系统 - 映射配置 (Mapping Profile)
// ==========================================
// 职责: 列名同义词表 + 状态标签表，可注入、可覆写
// 内置: Planning Center 导出（CSV 表头 + JSON attributes 键）
// ==========================================

use crate::domain::types::{MemberStatus, TargetField};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingProfile {
    pub name: String,
    /// 源列名 → 目标字段（大小写敏感）
    pub field_aliases: HashMap<String, TargetField>,
    /// 状态标签（小写）→ 会众状态
    pub status_aliases: HashMap<String, MemberStatus>,
    /// 未识别状态的回落值
    pub default_status: MemberStatus,
}

const FIELD_ALIASES: &[(&str, TargetField)] = &[
    // 姓名
    ("First Name", TargetField::FirstName),
    ("FirstName", TargetField::FirstName),
    ("Given Name", TargetField::FirstName),
    ("first_name", TargetField::FirstName),
    ("given_name", TargetField::FirstName),
    ("Last Name", TargetField::LastName),
    ("LastName", TargetField::LastName),
    ("Surname", TargetField::LastName),
    ("last_name", TargetField::LastName),
    // 联系方式
    ("Email", TargetField::Email),
    ("Email Address", TargetField::Email),
    ("Home Email", TargetField::Email),
    ("Primary Email", TargetField::Email),
    ("email", TargetField::Email),
    ("primary_email", TargetField::Email),
    ("Phone", TargetField::Phone),
    ("Phone Number", TargetField::Phone),
    ("Mobile Phone", TargetField::Phone),
    ("Home Phone", TargetField::Phone),
    ("Mobile", TargetField::Phone),
    ("phone", TargetField::Phone),
    ("phone_number", TargetField::Phone),
    // 地址
    ("Address", TargetField::Address),
    ("Street", TargetField::Address),
    ("Street Address", TargetField::Address),
    ("Home Address Street Line 1", TargetField::Address),
    ("address", TargetField::Address),
    ("street", TargetField::Address),
    ("City", TargetField::City),
    ("Home Address City", TargetField::City),
    ("city", TargetField::City),
    ("State", TargetField::State),
    ("Province", TargetField::State),
    ("Home Address State", TargetField::State),
    ("state", TargetField::State),
    ("Zip", TargetField::Zip),
    ("ZIP", TargetField::Zip),
    ("Zip Code", TargetField::Zip),
    ("Postal Code", TargetField::Zip),
    ("Home Address Zip Code", TargetField::Zip),
    ("zip", TargetField::Zip),
    ("postal_code", TargetField::Zip),
    // 会众信息
    ("Status", TargetField::Status),
    ("Membership", TargetField::Status),
    ("Membership Status", TargetField::Status),
    ("Member Status", TargetField::Status),
    ("membership", TargetField::Status),
    ("Birthdate", TargetField::BirthDate),
    ("Birthday", TargetField::BirthDate),
    ("Birth Date", TargetField::BirthDate),
    ("birthdate", TargetField::BirthDate),
    ("Join Date", TargetField::JoinDate),
    ("Member Since", TargetField::JoinDate),
    ("Membership Date", TargetField::JoinDate),
    ("joined_at", TargetField::JoinDate),
    ("Baptism Date", TargetField::BaptismDate),
    ("Baptized", TargetField::BaptismDate),
    ("baptism_date", TargetField::BaptismDate),
    ("Notes", TargetField::Notes),
    ("Note", TargetField::Notes),
    ("notes", TargetField::Notes),
];

const STATUS_ALIASES: &[(&str, MemberStatus)] = &[
    ("member", MemberStatus::Member),
    ("active member", MemberStatus::Member),
    ("covenant member", MemberStatus::Member),
    ("regular attender", MemberStatus::RegularAttender),
    ("regular attendee", MemberStatus::RegularAttender),
    ("regular_attender", MemberStatus::RegularAttender),
    ("attender", MemberStatus::RegularAttender),
    ("participant", MemberStatus::RegularAttender),
    ("visitor", MemberStatus::Visitor),
    ("guest", MemberStatus::Visitor),
    ("first time guest", MemberStatus::Visitor),
    ("inactive", MemberStatus::Inactive),
    ("former member", MemberStatus::Inactive),
];

impl MappingProfile {
    /// 内置 Planning Center 映射表
    pub fn planning_center() -> Self {
        Self {
            name: "planning_center".to_string(),
            field_aliases: FIELD_ALIASES
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            status_aliases: STATUS_ALIASES
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            default_status: MemberStatus::default(),
        }
    }

    /// 源列名查找（TRIM 后大小写敏感）
    pub fn lookup_field(&self, header: &str) -> Option<TargetField> {
        self.field_aliases.get(header.trim()).copied()
    }

    /// 状态标签查找（TRIM + 小写）
    pub fn lookup_status(&self, label: &str) -> Option<MemberStatus> {
        self.status_aliases
            .get(&label.trim().to_lowercase())
            .copied()
    }

    /// 合并列名覆写（覆写优先）
    pub fn extend_fields(&mut self, overrides: HashMap<String, TargetField>) {
        for (header, target) in overrides {
            self.field_aliases.insert(header.trim().to_string(), target);
        }
    }

    /// 合并状态覆写（键统一小写）
    pub fn extend_statuses(&mut self, overrides: HashMap<String, MemberStatus>) {
        for (label, status) in overrides {
            self.status_aliases
                .insert(label.trim().to_lowercase(), status);
        }
    }
}

impl Default for MappingProfile {
    fn default() -> Self {
        Self::planning_center()
    }
}
