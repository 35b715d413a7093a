// ==========================================
// ConfigManager 集成测试
// ==========================================
// 测试目标: config_kv 中的导入配置能驱动导入管道
// ==========================================

mod test_helpers;

use congregation_import::config::{config_keys, ConfigManager, ImportConfigReader};
use congregation_import::importer::{ExistingRecordIndex, PersonImporter};
use congregation_import::{MemberStatus, TargetField};
use test_helpers::{create_test_db, people_csv, RecordingWriter};

#[tokio::test]
async fn test_config_manager_defaults() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    assert_eq!(config.get_batch_size().await.unwrap(), 50);
    assert!(!config.get_strict_mode().await.unwrap());
    assert_eq!(config.get_locale().await.unwrap(), "en");

    let importer = PersonImporter::from_config(&config)
        .await
        .expect("Failed to build importer");
    assert_eq!(importer.options().batch_size, 50);
}

#[tokio::test]
async fn test_batch_size_setting_changes_chunking() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    config
        .set_import_config(config_keys::BATCH_SIZE, "7")
        .expect("Failed to set batch size");

    let importer = PersonImporter::from_config(&config).await.unwrap();
    let parsed = importer
        .parse_bytes(Some("people.csv"), people_csv(20).as_bytes())
        .unwrap();
    let mappings = importer.auto_map(&parsed.headers);
    let preview = importer
        .generate_preview(&parsed, &mappings, &ExistingRecordIndex::default())
        .unwrap();

    let writer = RecordingWriter::default();
    importer.run_import(&preview, &writer, |_| {}).await;
    assert_eq!(writer.batch_sizes(), vec![7, 7, 6]);
}

#[tokio::test]
async fn test_alias_overrides_flow_into_pipeline() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    config
        .set_import_config(config_keys::FIELD_ALIASES, r#"{"Household Role":"notes"}"#)
        .unwrap();
    config
        .set_import_config(config_keys::STATUS_ALIASES, r#"{"Deacon":"member"}"#)
        .unwrap();
    config
        .set_import_config(config_keys::DEFAULT_STATUS, "inactive")
        .unwrap();

    let importer = PersonImporter::from_config(&config).await.unwrap();
    let csv = "First Name,Last Name,Household Role,Status\nJane,Doe,Head,Deacon\nJohn,Doe,Child,Youth\n";
    let parsed = importer.parse_bytes(Some("people.csv"), csv.as_bytes()).unwrap();
    let mappings = importer.auto_map(&parsed.headers);
    assert_eq!(mappings[2].target, TargetField::Notes);

    let preview = importer
        .generate_preview(&parsed, &mappings, &ExistingRecordIndex::default())
        .unwrap();
    assert_eq!(preview.records[0].status, Some(MemberStatus::Member));
    assert_eq!(preview.records[0].notes.as_deref(), Some("Head"));
    assert_eq!(preview.records[1].status, Some(MemberStatus::Inactive));
    assert_eq!(preview.coerced_statuses, 1);
}

#[tokio::test]
async fn test_strict_and_locale_settings() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    config
        .set_import_config(config_keys::STRICT_MODE, "true")
        .unwrap();
    config.set_import_config(config_keys::LOCALE, "zh-CN").unwrap();

    let importer = PersonImporter::from_config(&config).await.unwrap();
    assert!(importer.options().strict);

    let err = importer
        .parse_bytes(Some("people.csv"), b"First Name,Last Name\nJane,Doe\nJohn\n")
        .unwrap_err();
    assert!(err.to_string().contains("列数不符"));

    let parsed = importer
        .parse_bytes(Some("people.csv"), b"First Name,Last Name\n,Doe\n")
        .unwrap();
    let mappings = importer.auto_map(&parsed.headers);
    let preview = importer
        .generate_preview(&parsed, &mappings, &ExistingRecordIndex::default())
        .unwrap();
    assert!(preview.errors[0].contains("第 2 行"));
}

#[test]
fn test_invalid_settings_are_rejected() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    assert!(config.set_import_config(config_keys::BATCH_SIZE, "abc").is_err());
    assert!(config.set_import_config(config_keys::STRICT_MODE, "maybe").is_err());
    assert!(config.set_import_config(config_keys::DEFAULT_STATUS, "elder").is_err());
    assert!(config.set_import_config("season_mode", "AUTO").is_err());

    let snapshot = config.get_config_snapshot().unwrap();
    assert_eq!(snapshot, "{}");
}
