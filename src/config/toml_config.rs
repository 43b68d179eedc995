use crate::adapters::firestore::{FirestoreSettings, DEFAULT_BASE_URL, DEFAULT_DATABASE};
use crate::utils::error::{MigratorError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub migrate: MigrateConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Firestore,
    BackupFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub r#type: StoreKind,
    pub project_id: Option<String>,
    pub database: Option<String>,
    pub base_url: Option<String>,
    pub access_token: Option<String>,
    #[serde(default = "default_collection")]
    pub collection: String,
    pub page_size: Option<usize>,
    pub timeout_seconds: Option<u64>,
    /// Source file when `type = "backup_file"`.
    pub backup_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    #[serde(default = "default_output_path")]
    pub output_path: String,
    pub filename: Option<String>,
    pub timestamped: Option<bool>,
    pub compression: Option<CompressionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrateConfig {
    pub apply: Option<bool>,
    /// Migrate this one document instead of the whole collection.
    pub document: Option<String>,
    #[serde(default = "default_output_path")]
    pub output_path: String,
    pub preview_filename: Option<String>,
    pub report_filename: Option<String>,
    pub backup_before_apply: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

fn default_collection() -> String {
    "users".to_string()
}

fn default_output_path() -> String {
    "./output".to_string()
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            filename: None,
            timestamped: None,
            compression: None,
        }
    }
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            apply: None,
            document: None,
            output_path: default_output_path(),
            preview_filename: None,
            report_filename: None,
            backup_before_apply: None,
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${FIRESTORE_ACCESS_TOKEN})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| MigratorError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("store.collection", &self.store.collection)?;
        if self.store.collection.contains('/') {
            return Err(MigratorError::InvalidConfigValueError {
                field: "store.collection".to_string(),
                value: self.store.collection.clone(),
                reason: "Only top-level collections are supported".to_string(),
            });
        }

        match self.store.r#type {
            StoreKind::Firestore => {
                self.firestore_settings()?;
            }
            StoreKind::BackupFile => {
                let file = validation::validate_required_field(
                    "store.backup_file",
                    &self.store.backup_file,
                )?;
                validation::validate_path("store.backup_file", file)?;
            }
        }

        validation::validate_path("backup.output_path", &self.backup.output_path)?;
        validation::validate_file_name("backup.filename", &self.backup_filename())?;
        if let Some(compression) = &self.backup.compression {
            if compression.enabled {
                validation::validate_file_name(
                    "backup.compression.filename",
                    &self.backup_archive_filename(),
                )?;
            }
        }

        validation::validate_path("migrate.output_path", &self.migrate.output_path)?;
        validation::validate_file_name("migrate.preview_filename", self.preview_filename())?;
        validation::validate_file_name("migrate.report_filename", self.report_filename())?;
        if let Some(document) = &self.migrate.document {
            validation::validate_document_path(
                "migrate.document",
                document,
                &self.store.collection,
            )?;
        }

        Ok(())
    }

    /// Firestore 連線設定
    pub fn firestore_settings(&self) -> Result<FirestoreSettings> {
        let project_id =
            validation::validate_required_field("store.project_id", &self.store.project_id)?;
        validation::validate_non_empty_string("store.project_id", project_id)?;

        let access_token =
            validation::validate_required_field("store.access_token", &self.store.access_token)?;
        validation::validate_non_empty_string("store.access_token", access_token)?;
        if access_token.starts_with("${") {
            return Err(MigratorError::InvalidConfigValueError {
                field: "store.access_token".to_string(),
                value: access_token.clone(),
                reason: "Environment variable is not set".to_string(),
            });
        }

        let base_url = self
            .store
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        validation::validate_url("store.base_url", &base_url)?;

        let page_size = self.store.page_size.unwrap_or(300);
        validation::validate_range("store.page_size", page_size, 1, 1000)?;

        let timeout_seconds = self.store.timeout_seconds.unwrap_or(30);
        validation::validate_range("store.timeout_seconds", timeout_seconds, 1, 600)?;

        Ok(FirestoreSettings {
            base_url,
            project_id: project_id.clone(),
            database: self
                .store
                .database
                .clone()
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            access_token: access_token.clone(),
            page_size,
            timeout: Duration::from_secs(timeout_seconds),
        })
    }

    /// 備份檔名，`timestamped` 時附加 UTC 時間
    pub fn backup_filename(&self) -> String {
        let filename = self.backup.filename.as_deref().unwrap_or("backup.json");
        if !self.backup.timestamped.unwrap_or(false) {
            return filename.to_string();
        }

        stamped_filename(filename, chrono::Utc::now())
    }

    /// 寫回前的原始文件備份，每次執行各自一個檔案
    pub fn pre_migration_backup_filename(&self) -> String {
        stamped_filename("pre_migration_backup.json", chrono::Utc::now())
    }

    pub fn backup_archive_filename(&self) -> String {
        self.backup
            .compression
            .as_ref()
            .and_then(|c| c.filename.clone())
            .unwrap_or_else(|| "backup.zip".to_string())
    }

    pub fn compression_enabled(&self) -> bool {
        self.backup
            .compression
            .as_ref()
            .map(|c| c.enabled)
            .unwrap_or(false)
    }

    pub fn preview_filename(&self) -> &str {
        self.migrate
            .preview_filename
            .as_deref()
            .unwrap_or("migrated.json")
    }

    pub fn report_filename(&self) -> &str {
        self.migrate
            .report_filename
            .as_deref()
            .unwrap_or("migration_report.csv")
    }

    /// 是否寫回資料庫（預設關閉）
    pub fn apply_enabled(&self) -> bool {
        self.migrate.apply.unwrap_or(false)
    }

    pub fn backup_before_apply(&self) -> bool {
        self.migrate.backup_before_apply.unwrap_or(true)
    }

    pub fn collection(&self) -> &str {
        &self.store.collection
    }

    /// 取得監控設定
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    /// 配置摘要；不需要通過驗證，也不會顯示 access token
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "📋 Configuration Summary:".to_string(),
            format!(
                "  Pipeline: {} v{}",
                self.pipeline.name,
                self.pipeline.version.as_deref().unwrap_or("-")
            ),
        ];

        lines.push(match self.store.r#type {
            StoreKind::Firestore => format!(
                "  Store: Firestore project {} ({})",
                self.store.project_id.as_deref().unwrap_or("-"),
                self.store.database.as_deref().unwrap_or(DEFAULT_DATABASE)
            ),
            StoreKind::BackupFile => format!(
                "  Store: backup file {}",
                self.store.backup_file.as_deref().unwrap_or("-")
            ),
        });
        lines.push(format!("  Collection: {}", self.collection()));

        let mut backup = format!("  Backup: {}/{}", self.backup.output_path, self.backup_filename());
        if self.compression_enabled() {
            backup.push_str(&format!(" (zipped as {})", self.backup_archive_filename()));
        }
        lines.push(backup);

        lines.push(format!("  Migrate output: {}", self.migrate.output_path));
        if let Some(document) = &self.migrate.document {
            lines.push(format!("  Single document: {}", document));
        }
        lines.push(format!(
            "  Write back: {}",
            if self.apply_enabled() {
                "enabled"
            } else {
                "disabled (dry run)"
            }
        ));
        lines.push(format!("  Monitoring: {}", self.monitoring_enabled()));

        lines.join("\n")
    }
}

/// `backup.json` → `backup-20240101T000000Z.json`
pub fn stamped_filename(filename: &str, at: chrono::DateTime<chrono::Utc>) -> String {
    let stamp = at.format("%Y%m%dT%H%M%SZ");
    match filename.rsplit_once('.') {
        Some((stem, ext)) => format!("{}-{}.{}", stem, stamp, ext),
        None => format!("{}-{}", filename, stamp),
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
