// ==========================================
// 会众管理系统 - 字段映射器实现
// ==========================================
// 阶段 1: 源列名 → 目标字段
// 规则: 同义词表精确匹配（TRIM 后大小写敏感），未命中 → Skip
// ==========================================

use crate::config::mapping_profile::MappingProfile;
use crate::domain::person::{FieldMapping, RawRecord};
use crate::domain::types::TargetField;
use crate::importer::error::{ImportError, PipelineResult};
use crate::importer::importer_trait::FieldMapper as FieldMapperTrait;
use std::collections::BTreeMap;

pub struct FieldMapper {
    profile: MappingProfile,
}

impl FieldMapper {
    pub fn new(profile: MappingProfile) -> Self {
        Self { profile }
    }

    /// 用户覆写映射（按源列名替换目标字段）
    ///
    /// # 返回
    /// - Err(UnknownColumn): 覆写的源列不在映射表中
    pub fn apply_overrides(
        &self,
        mut mappings: Vec<FieldMapping>,
        overrides: &[FieldMapping],
    ) -> PipelineResult<Vec<FieldMapping>> {
        for over in overrides {
            let slot = mappings
                .iter_mut()
                .find(|m| m.source == over.source.trim())
                .ok_or_else(|| ImportError::UnknownColumn(over.source.clone()))?;
            slot.target = over.target;
        }
        Ok(mappings)
    }

    /// 检查映射单射性（严格模式使用）
    ///
    /// # 返回
    /// - Err(MappingConflict): 同一目标字段由多个源列映射
    pub fn ensure_injective(&self, mappings: &[FieldMapping]) -> PipelineResult<()> {
        let mut by_target: BTreeMap<TargetField, Vec<&str>> = BTreeMap::new();
        for mapping in mappings.iter().filter(|m| m.target != TargetField::Skip) {
            by_target
                .entry(mapping.target)
                .or_default()
                .push(mapping.source.as_str());
        }

        match by_target.into_iter().find(|(_, sources)| sources.len() > 1) {
            Some((target, sources)) => Err(ImportError::MappingConflict {
                target: target.to_string(),
                sources: sources.join(", "),
            }),
            None => Ok(()),
        }
    }
}

impl FieldMapperTrait for FieldMapper {
    fn auto_map(&self, headers: &[String]) -> Vec<FieldMapping> {
        headers
            .iter()
            .map(|header| {
                let target = self
                    .profile
                    .lookup_field(header)
                    .unwrap_or(TargetField::Skip);
                FieldMapping::new(header.trim(), target)
            })
            .collect()
    }

    fn project(&self, raw: &RawRecord, mappings: &[FieldMapping]) -> BTreeMap<TargetField, String> {
        let mut fields = BTreeMap::new();

        for mapping in mappings {
            if mapping.target == TargetField::Skip {
                continue;
            }
            let Some(value) = raw.get(&mapping.source) else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            fields.insert(mapping.target, value.to_string());
        }

        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn mapper() -> FieldMapper {
        FieldMapper::new(MappingProfile::planning_center())
    }

    fn raw(pairs: &[(&str, &str)]) -> RawRecord {
        RawRecord {
            row_number: 2,
            values: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn test_auto_map_known_and_unknown_headers() {
        let headers = vec![
            "First Name".to_string(),
            "Last Name".to_string(),
            "Favorite Color".to_string(),
            "email".to_string(),
        ];
        let mappings = mapper().auto_map(&headers);

        assert_eq!(mappings[0].target, TargetField::FirstName);
        assert_eq!(mappings[1].target, TargetField::LastName);
        assert_eq!(mappings[2].target, TargetField::Skip);
        assert_eq!(mappings[3].target, TargetField::Email);
    }

    #[test]
    fn test_auto_map_is_case_sensitive() {
        let mappings = mapper().auto_map(&["FIRST NAME".to_string()]);
        assert_eq!(mappings[0].target, TargetField::Skip);
    }

    #[test]
    fn test_project_later_non_empty_wins() {
        let mappings = vec![
            FieldMapping::new("Email", TargetField::Email),
            FieldMapping::new("Work Email", TargetField::Email),
            FieldMapping::new("Other Email", TargetField::Email),
        ];
        let row = raw(&[
            ("Email", "home@x.com"),
            ("Work Email", "work@x.com"),
            ("Other Email", ""),
        ]);

        let fields = mapper().project(&row, &mappings);
        assert_eq!(fields.get(&TargetField::Email).map(String::as_str), Some("work@x.com"));
    }

    #[test]
    fn test_project_is_deterministic() {
        let row = raw(&[("First Name", "Jane"), ("Last Name", "Doe"), ("Notes", "")]);
        let m = mapper();
        let mappings = m.auto_map(&["First Name".into(), "Last Name".into(), "Notes".into()]);

        let first = m.project(&row, &mappings);
        let second = m.project(&row, &mappings);
        assert_eq!(first, second);
        assert!(!first.contains_key(&TargetField::Notes));
    }

    #[test]
    fn test_apply_overrides() {
        let m = mapper();
        let mappings = m.auto_map(&["First Name".into(), "Nickname".into()]);
        let mappings = m
            .apply_overrides(mappings, &[FieldMapping::new("Nickname", TargetField::Notes)])
            .unwrap();
        assert_eq!(mappings[1].target, TargetField::Notes);

        let err = m
            .apply_overrides(mappings, &[FieldMapping::new("Missing", TargetField::Notes)])
            .unwrap_err();
        assert!(matches!(err, ImportError::UnknownColumn(_)));
    }

    #[test]
    fn test_ensure_injective() {
        let m = mapper();
        let ok = vec![
            FieldMapping::new("A", TargetField::Email),
            FieldMapping::new("B", TargetField::Skip),
            FieldMapping::new("C", TargetField::Skip),
        ];
        assert!(m.ensure_injective(&ok).is_ok());

        let conflict = vec![
            FieldMapping::new("Email", TargetField::Email),
            FieldMapping::new("Work Email", TargetField::Email),
        ];
        let err = m.ensure_injective(&conflict).unwrap_err();
        assert!(matches!(err, ImportError::MappingConflict { .. }));
    }
}
