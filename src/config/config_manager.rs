// ==========================================
// 会众管理系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::{ImportConfigReader, DEFAULT_BATCH_SIZE, DEFAULT_LOCALE};
use crate::config::mapping_profile::MappingProfile;
use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::types::{MemberStatus, TargetField};
use crate::importer::error::ImportError;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::sync::{Arc, Mutex};

type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例（必要时建表）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!(config_key = key, "配置已更新");
        Ok(())
    }

    /// 校验后写入导入配置（仅接受 config_keys 中的键）
    pub fn set_import_config(&self, key: &str, value: &str) -> ConfigResult<()> {
        validate_config_value(key, value)?;
        self.set_config_value(key, value.trim())
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key",
        )?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 读取 JSON 对象类型的覆写表；格式错误时返回空表
    fn get_json_overrides<V>(&self, key: &str) -> ConfigResult<HashMap<String, V>>
    where
        V: serde::de::DeserializeOwned,
    {
        let Some(raw) = self.get_config_value(key)? else {
            return Ok(HashMap::new());
        };

        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(
                config_key = key,
                raw_value = %raw,
                error = %e,
                "映射覆写配置格式错误，忽略覆写"
            );
            HashMap::new()
        }))
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_batch_size(&self) -> ConfigResult<usize> {
        let value =
            self.get_config_or_default(config_keys::BATCH_SIZE, &DEFAULT_BATCH_SIZE.to_string())?;
        Ok(value
            .trim()
            .parse::<usize>()
            .unwrap_or(DEFAULT_BATCH_SIZE)
            .max(1))
    }

    async fn get_strict_mode(&self) -> ConfigResult<bool> {
        let value = self.get_config_or_default(config_keys::STRICT_MODE, "false")?;
        Ok(matches!(
            value.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ))
    }

    async fn get_locale(&self) -> ConfigResult<String> {
        let value = self.get_config_or_default(config_keys::LOCALE, DEFAULT_LOCALE)?;
        match value.trim() {
            "en" | "zh-CN" => Ok(value.trim().to_string()),
            other => {
                tracing::warn!(locale = other, "不支持的语言，使用默认语言");
                Ok(DEFAULT_LOCALE.to_string())
            }
        }
    }

    async fn get_mapping_profile(&self) -> ConfigResult<MappingProfile> {
        let mut profile = MappingProfile::planning_center();

        let field_overrides: HashMap<String, TargetField> =
            self.get_json_overrides(config_keys::FIELD_ALIASES)?;
        profile.extend_fields(field_overrides);

        let status_overrides: HashMap<String, MemberStatus> =
            self.get_json_overrides(config_keys::STATUS_ALIASES)?;
        profile.extend_statuses(status_overrides);

        if let Some(raw) = self.get_config_value(config_keys::DEFAULT_STATUS)? {
            match raw.parse::<MemberStatus>() {
                Ok(status) => profile.default_status = status,
                Err(e) => tracing::warn!(raw_value = %raw, error = %e, "默认状态配置无效，使用 visitor"),
            }
        }

        Ok(profile)
    }
}

/// 校验导入配置值的格式
pub fn validate_config_value(key: &str, value: &str) -> Result<(), ImportError> {
    let invalid = |message: String| ImportError::ConfigValueError {
        key: key.to_string(),
        value: value.to_string(),
        message,
    };
    let trimmed = value.trim();

    match key {
        config_keys::BATCH_SIZE => match trimmed.parse::<usize>() {
            Ok(n) if n >= 1 => Ok(()),
            _ => Err(invalid("批次大小必须为正整数".to_string())),
        },
        config_keys::STRICT_MODE => match trimmed.to_lowercase().as_str() {
            "1" | "0" | "true" | "false" | "yes" | "no" | "on" | "off" => Ok(()),
            _ => Err(invalid("应为 true / false".to_string())),
        },
        config_keys::LOCALE => match trimmed {
            "en" | "zh-CN" => Ok(()),
            _ => Err(invalid("支持的语言: en, zh-CN".to_string())),
        },
        config_keys::DEFAULT_STATUS => trimmed.parse::<MemberStatus>().map(|_| ()).map_err(invalid),
        config_keys::FIELD_ALIASES => serde_json::from_str::<HashMap<String, TargetField>>(trimmed)
            .map(|_| ())
            .map_err(|e| invalid(e.to_string())),
        config_keys::STATUS_ALIASES => {
            serde_json::from_str::<HashMap<String, MemberStatus>>(trimmed)
                .map(|_| ())
                .map_err(|e| invalid(e.to_string()))
        }
        other => Err(ImportError::ConfigReadError {
            key: other.to_string(),
            message: "未知的配置键".to_string(),
        }),
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 批量写入
    pub const BATCH_SIZE: &str = "batch_size";

    // 严格模式
    pub const STRICT_MODE: &str = "strict_mode";

    // 行级提示语言
    pub const LOCALE: &str = "locale";

    // 映射覆写 (JSON)
    pub const FIELD_ALIASES: &str = "field_aliases";
    pub const STATUS_ALIASES: &str = "status_aliases";
    pub const DEFAULT_STATUS: &str = "default_status";
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_manager() -> (NamedTempFile, ConfigManager) {
        let temp_file = NamedTempFile::new().unwrap();
        let manager = ConfigManager::new(temp_file.path().to_str().unwrap()).unwrap();
        (temp_file, manager)
    }

    #[tokio::test]
    async fn test_defaults_when_empty() {
        let (_temp, manager) = create_manager();

        assert_eq!(manager.get_batch_size().await.unwrap(), 50);
        assert!(!manager.get_strict_mode().await.unwrap());
        assert_eq!(manager.get_locale().await.unwrap(), "en");
        assert_eq!(
            manager.get_mapping_profile().await.unwrap(),
            MappingProfile::planning_center()
        );
    }

    #[tokio::test]
    async fn test_invalid_batch_size_falls_back() {
        let (_temp, manager) = create_manager();
        manager.set_config_value(config_keys::BATCH_SIZE, "abc").unwrap();
        assert_eq!(manager.get_batch_size().await.unwrap(), 50);

        manager.set_config_value(config_keys::BATCH_SIZE, "0").unwrap();
        assert_eq!(manager.get_batch_size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_malformed_alias_json_is_ignored() {
        let (_temp, manager) = create_manager();
        manager
            .set_config_value(config_keys::FIELD_ALIASES, "{not json")
            .unwrap();

        let profile = manager.get_mapping_profile().await.unwrap();
        assert_eq!(profile.lookup_field("First Name"), Some(TargetField::FirstName));
    }

    #[test]
    fn test_set_import_config_validates() {
        let (_temp, manager) = create_manager();

        assert!(manager.set_import_config(config_keys::BATCH_SIZE, "25").is_ok());
        assert!(manager.set_import_config(config_keys::BATCH_SIZE, "0").is_err());
        assert!(manager.set_import_config(config_keys::LOCALE, "fr").is_err());
        assert!(manager.set_import_config("unknown_key", "1").is_err());
        assert!(manager
            .set_import_config(config_keys::FIELD_ALIASES, r#"{"Nickname":"notes"}"#)
            .is_ok());
        assert!(manager
            .set_import_config(config_keys::STATUS_ALIASES, r#"{"Deacon":"elder"}"#)
            .is_err());
    }

    #[tokio::test]
    async fn test_alias_overrides_are_applied() {
        let (_temp, manager) = create_manager();
        manager
            .set_import_config(config_keys::FIELD_ALIASES, r#"{"Nickname":"notes"}"#)
            .unwrap();
        manager
            .set_import_config(config_keys::STATUS_ALIASES, r#"{"Deacon":"member"}"#)
            .unwrap();
        manager
            .set_import_config(config_keys::DEFAULT_STATUS, "inactive")
            .unwrap();

        let profile = manager.get_mapping_profile().await.unwrap();
        assert_eq!(profile.lookup_field("Nickname"), Some(TargetField::Notes));
        assert_eq!(profile.lookup_status("deacon"), Some(MemberStatus::Member));
        assert_eq!(profile.default_status, MemberStatus::Inactive);
    }

    #[test]
    fn test_snapshot_contains_keys() {
        let (_temp, manager) = create_manager();
        manager.set_config_value(config_keys::STRICT_MODE, "true").unwrap();

        let snapshot = manager.get_config_snapshot().unwrap();
        assert!(snapshot.contains("strict_mode"));
    }
}
