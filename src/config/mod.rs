// ==========================================
// 会众管理系统 - 配置层
// ==========================================
// 职责: 导入配置管理（批次大小、严格模式、语言、映射覆写）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config_trait;
pub mod mapping_profile;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use import_config_trait::{ImportConfigReader, ImportOptions};
pub use mapping_profile::MappingProfile;
