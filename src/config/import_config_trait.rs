// ==========================================
// 会众管理系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入管道所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::mapping_profile::MappingProfile;
use async_trait::async_trait;
use std::error::Error;

/// 默认批次大小
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// 默认语言
pub const DEFAULT_LOCALE: &str = "en";

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 获取每批写入的记录数
    ///
    /// # 默认值
    /// - 50（小于 1 时按 1 处理）
    async fn get_batch_size(&self) -> Result<usize, Box<dyn Error + Send + Sync>>;

    /// 获取严格模式开关
    ///
    /// # 说明
    /// - false: 列数不符的行静默丢弃，未识别状态回落到默认状态
    /// - true: 上述情况改为报错
    ///
    /// # 默认值
    /// - false
    async fn get_strict_mode(&self) -> Result<bool, Box<dyn Error + Send + Sync>>;

    /// 获取行级提示语言（"en" / "zh-CN"）
    ///
    /// # 默认值
    /// - en
    async fn get_locale(&self) -> Result<String, Box<dyn Error + Send + Sync>>;

    /// 获取映射配置（内置表 + 覆写）
    async fn get_mapping_profile(&self)
        -> Result<MappingProfile, Box<dyn Error + Send + Sync>>;
}

// ==========================================
// ImportOptions - 已解析的导入选项
// ==========================================
// 管道内只读，一次导入会话使用同一份
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOptions {
    pub batch_size: usize,
    pub strict: bool,
    pub locale: String,
    pub profile: MappingProfile,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            strict: false,
            locale: DEFAULT_LOCALE.to_string(),
            profile: MappingProfile::planning_center(),
        }
    }
}

impl ImportOptions {
    /// 从配置读取器加载
    pub async fn from_config<C: ImportConfigReader + ?Sized>(
        config: &C,
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        Ok(Self {
            batch_size: config.get_batch_size().await?.max(1),
            strict: config.get_strict_mode().await?,
            locale: config.get_locale().await?,
            profile: config.get_mapping_profile().await?,
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedConfig;

    #[async_trait]
    impl ImportConfigReader for FixedConfig {
        async fn get_batch_size(&self) -> Result<usize, Box<dyn Error + Send + Sync>> {
            Ok(0)
        }

        async fn get_strict_mode(&self) -> Result<bool, Box<dyn Error + Send + Sync>> {
            Ok(true)
        }

        async fn get_locale(&self) -> Result<String, Box<dyn Error + Send + Sync>> {
            Ok("zh-CN".to_string())
        }

        async fn get_mapping_profile(
            &self,
        ) -> Result<MappingProfile, Box<dyn Error + Send + Sync>> {
            Ok(MappingProfile::planning_center())
        }
    }

    #[tokio::test]
    async fn test_from_config_clamps_batch_size() {
        let options = ImportOptions::from_config(&FixedConfig).await.unwrap();
        assert_eq!(options.batch_size, 1);
        assert!(options.strict);
        assert_eq!(options.locale, "zh-CN");
    }

    #[test]
    fn test_default_options() {
        let options = ImportOptions::default();
        assert_eq!(options.batch_size, 50);
        assert!(!options.strict);
        assert_eq!(options.locale, "en");
    }
}
