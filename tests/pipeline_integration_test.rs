use dib_migrate::adapters::backup_file::decode_backup;
use dib_migrate::core::{DocumentStore, Pipeline};
use dib_migrate::utils::error::ErrorCategory;
use dib_migrate::{
    BackupFileStore, BackupPipeline, EtlEngine, FirestoreConnection, LocalStorage,
    MigratePipeline, MigratorError, TomlConfig,
};
use httpmock::prelude::*;
use serde_json::json;
use std::io::Read;
use std::path::Path;
use tempfile::TempDir;

fn offline_config(backup_file: &Path, output: &Path, extra: &str) -> TomlConfig {
    TomlConfig::from_toml_str(&format!(
        r#"
[pipeline]
name = "offline-test"

[store]
type = "backup_file"
backup_file = "{}"

[backup]
output_path = "{}"

[migrate]
output_path = "{}"
{}
"#,
        backup_file.display(),
        output.display(),
        output.display(),
        extra
    ))
    .unwrap()
}

fn write_source(dir: &TempDir, documents: serde_json::Value) -> std::path::PathBuf {
    let path = dir.path().join("source.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&documents).unwrap()).unwrap();
    path
}

fn pre_migration_backups(output: &Path) -> Vec<std::path::PathBuf> {
    let mut backups: Vec<_> = match std::fs::read_dir(output) {
        Ok(entries) => entries
            .map(|entry| entry.unwrap().path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map_or(false, |name| name.starts_with("pre_migration_backup"))
            })
            .collect(),
        Err(_) => Vec::new(),
    };
    backups.sort();
    backups
}

async fn run_migrate(source: &Path, output: &Path, extra: &str) -> String {
    let config = offline_config(source, output, extra);
    let store = BackupFileStore::open(source).unwrap();
    let storage = LocalStorage::new(config.migrate.output_path.clone());
    EtlEngine::new(MigratePipeline::new(store, storage, config))
        .run()
        .await
        .unwrap()
}

fn legacy_users() -> serde_json::Value {
    json!({
        "users/alice": {
            "Semester": "2024a",
            "Courses": ["03661111", "03661101"],
            "Groups": {"03661111": ["01", "08"]},
            "Colors": {"03661101": "#228be6"},
            "Taken Courses (Dib It Serialize)": ["03661000"],
            "School (Dib It Serialize)": "Exact Sciences",
            "Courses 2023b": ["03681118"]
        },
        "users/bob": {
            "semester": "2024a",
            "courses": {"2024a": [{"id": "03661111"}]}
        }
    })
}

#[tokio::test]
async fn test_backup_from_firestore_writes_path_map() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    let list = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/projects/dib-it/databases/test-db/documents/users");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({
                "documents": [{
                    "name": "projects/dib-it/databases/test-db/documents/users/alice",
                    "fields": {
                        "Semester": {"stringValue": "2024a"},
                        "School (Dib It Serialize)": {"stringValue": "מדעים מדויקים"}
                    }
                }]
            }));
    });

    let config = TomlConfig::from_toml_str(&format!(
        r#"
[pipeline]
name = "backup-test"

[store]
type = "firestore"
project_id = "dib-it"
database = "test-db"
base_url = "{}"
access_token = "test-token"

[backup]
output_path = "{}"
"#,
        server.base_url(),
        output_path
    ))
    .unwrap();

    let connection = FirestoreConnection::open(config.firestore_settings().unwrap()).unwrap();
    let storage = LocalStorage::new(config.backup.output_path.clone());
    let engine = EtlEngine::new(BackupPipeline::new(connection, storage, config));

    let written = engine.run().await.unwrap();

    list.assert();
    assert!(written.ends_with("backup.json"));

    let text = std::fs::read_to_string(temp_dir.path().join("backup.json")).unwrap();
    assert!(text.contains("\n    \"users/alice\": {"));
    assert!(text.contains("מדעים מדויקים"));

    let backup = decode_backup(text.as_bytes()).unwrap();
    assert_eq!(
        backup["users/alice"],
        json!({"Semester": "2024a", "School (Dib It Serialize)": "מדעים מדויקים"})
    );
}

#[tokio::test]
async fn test_compressed_backup() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_source(&temp_dir, legacy_users());
    let output = temp_dir.path().join("out");
    let mut config = offline_config(&source, &output, "");
    config.backup.compression = Some(dib_migrate::config::toml_config::CompressionConfig {
        enabled: true,
        filename: None,
    });

    let store = BackupFileStore::open(&source).unwrap();
    let storage = LocalStorage::new(config.backup.output_path.clone());
    let written = EtlEngine::new(BackupPipeline::new(store, storage, config))
        .run()
        .await
        .unwrap();

    assert!(written.ends_with("backup.zip"));
    let zip_data = std::fs::read(output.join("backup.zip")).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
    assert_eq!(archive.len(), 1);

    let mut entry = archive.by_name("backup.json").unwrap();
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    let backup = decode_backup(content.as_bytes()).unwrap();
    assert_eq!(backup.len(), 2);
}

#[tokio::test]
async fn test_migrate_dry_run_writes_preview_and_report_only() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_source(&temp_dir, legacy_users());
    let output = temp_dir.path().join("out");
    let config = offline_config(&source, &output, "");

    let store = BackupFileStore::open(&source).unwrap();
    let storage = LocalStorage::new(config.migrate.output_path.clone());
    let written = EtlEngine::new(MigratePipeline::new(store, storage, config))
        .run()
        .await
        .unwrap();

    assert!(written.ends_with("migrated.json"));

    let preview = decode_backup(&std::fs::read(output.join("migrated.json")).unwrap()).unwrap();
    assert_eq!(preview.len(), 1);
    assert_eq!(
        preview["users/alice"],
        json!({
            "semester": "2024a",
            "school": "Exact Sciences",
            "courses": {
                "2023b": [{"id": "03681118"}],
                "2024a": [
                    {"id": "03661111", "groups": ["01", "08"]},
                    {"id": "03661101", "color": "#228be6"}
                ]
            }
        })
    );

    let report = std::fs::read_to_string(output.join("migration_report.csv")).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(
        lines,
        vec![
            "path,status,semesters,course_entries,unmapped_fields",
            "users/alice,migrated,2023b;2024a,3,",
            "users/bob,skipped,,0,",
        ]
    );

    // Source untouched without --apply
    let on_disk = decode_backup(&std::fs::read(&source).unwrap()).unwrap();
    assert_eq!(on_disk, legacy_users().as_object().unwrap().clone());
    assert!(pre_migration_backups(&output).is_empty());
}

#[tokio::test]
async fn test_migrate_apply_writes_back_and_keeps_originals() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_source(&temp_dir, legacy_users());
    let output = temp_dir.path().join("out");
    run_migrate(&source, &output, "apply = true").await;

    let on_disk = decode_backup(&std::fs::read(&source).unwrap()).unwrap();
    assert_eq!(on_disk["users/alice"]["semester"], json!("2024a"));
    assert!(on_disk["users/alice"].get("Semester").is_none());
    // Skipped documents are never rewritten
    assert_eq!(on_disk["users/bob"], legacy_users()["users/bob"]);

    let backups = pre_migration_backups(&output);
    assert_eq!(backups.len(), 1);
    let originals = decode_backup(&std::fs::read(&backups[0]).unwrap()).unwrap();
    assert_eq!(originals.len(), 1);
    assert_eq!(originals["users/alice"], legacy_users()["users/alice"]);
}

#[tokio::test]
async fn test_second_apply_keeps_earlier_originals() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_source(
        &temp_dir,
        json!({"users/alice": legacy_users()["users/alice"].clone()}),
    );
    let output = temp_dir.path().join("out");

    run_migrate(&source, &output, "apply = true").await;

    // A new legacy user shows up between runs
    let mut on_disk = decode_backup(&std::fs::read(&source).unwrap()).unwrap();
    on_disk.insert(
        "users/carol".to_string(),
        json!({"Semester": "2024b", "Courses": ["03681118"]}),
    );
    std::fs::write(&source, serde_json::to_vec_pretty(&on_disk).unwrap()).unwrap();

    run_migrate(&source, &output, "apply = true").await;

    let backups: Vec<serde_json::Map<String, serde_json::Value>> = pre_migration_backups(&output)
        .iter()
        .map(|path| decode_backup(&std::fs::read(path).unwrap()).unwrap())
        .collect();
    assert_eq!(backups.len(), 2);
    assert!(backups
        .iter()
        .any(|backup| backup.get("users/alice") == Some(&legacy_users()["users/alice"])));
    assert!(backups
        .iter()
        .any(|backup| backup.get("users/carol").is_some() && !backup.contains_key("users/alice")));
}

#[tokio::test]
async fn test_mixed_shape_document_is_left_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let mixed = json!({
        "Semester": "2024a",
        "Courses": ["03661111"],
        "semester": "2025a",
        "courses": {"2025a": [{"id": "03681118", "color": "#fa5252"}]}
    });
    let source = write_source(
        &temp_dir,
        json!({
            "users/alice": legacy_users()["users/alice"].clone(),
            "users/dana": mixed.clone()
        }),
    );
    let output = temp_dir.path().join("out");

    run_migrate(&source, &output, "apply = true").await;

    let on_disk = decode_backup(&std::fs::read(&source).unwrap()).unwrap();
    assert_eq!(on_disk["users/dana"], mixed);
    assert!(on_disk["users/alice"].get("Semester").is_none());

    let preview = decode_backup(&std::fs::read(output.join("migrated.json")).unwrap()).unwrap();
    assert!(!preview.contains_key("users/dana"));

    let report = std::fs::read_to_string(output.join("migration_report.csv")).unwrap();
    assert!(report.lines().any(|line| line == "users/dana,mixed_shape,,0,"));

    let backups = pre_migration_backups(&output);
    let originals = decode_backup(&std::fs::read(&backups[0]).unwrap()).unwrap();
    assert!(!originals.contains_key("users/dana"));
}

#[tokio::test]
async fn test_migrate_single_document() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_source(&temp_dir, legacy_users());
    let output = temp_dir.path().join("out");
    let config = offline_config(&source, &output, "document = \"users/alice\"");

    let store = BackupFileStore::open(&source).unwrap();
    let pipeline = MigratePipeline::new(
        store,
        LocalStorage::new(config.migrate.output_path.clone()),
        config,
    );

    let records = pipeline.extract().await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].path, "users/alice");
}

#[tokio::test]
async fn test_migrate_missing_single_document() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_source(&temp_dir, legacy_users());
    let output = temp_dir.path().join("out");
    let config = offline_config(&source, &output, "document = \"users/nobody\"");

    let store = BackupFileStore::open(&source).unwrap();
    let pipeline = MigratePipeline::new(
        store,
        LocalStorage::new(config.migrate.output_path.clone()),
        config,
    );

    assert!(matches!(
        pipeline.extract().await,
        Err(MigratorError::ConfigError { .. })
    ));
}

#[tokio::test]
async fn test_first_broken_document_aborts_run() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_source(
        &temp_dir,
        json!({
            "users/alice": {"Courses": ["03661111"]},
            "users/bob": {"Semester": "2024a", "Courses": ["03661111"]}
        }),
    );
    let output = temp_dir.path().join("out");
    let config = offline_config(&source, &output, "apply = true");

    let store = BackupFileStore::open(&source).unwrap();
    let storage = LocalStorage::new(config.migrate.output_path.clone());
    let err = EtlEngine::new(MigratePipeline::new(store, storage, config))
        .run()
        .await
        .unwrap_err();

    match &err {
        MigratorError::DocumentFailed { path, source } => {
            assert_eq!(path, "users/alice");
            assert!(matches!(**source, MigratorError::MissingSemester { .. }));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(err.category(), ErrorCategory::Data);
    assert!(!output.join("migrated.json").exists());

    // Nothing was written back
    let store = BackupFileStore::open(&source).unwrap();
    let bob = store.get_document("users/bob").await.unwrap().unwrap();
    assert_eq!(bob.data["Semester"], json!("2024a"));
}
