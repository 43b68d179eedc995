use crate::adapters::backup_file::encode_backup;
use crate::app::pipelines::backup_pipeline::backup_map;
use crate::config::toml_config::TomlConfig;
use crate::core::migrate::{has_migrated_fields, is_legacy_shape, migrate_document};
use crate::core::{
    DocumentOutcome, DocumentStore, MigrationStatus, Pipeline, Record, Storage, TransformResult,
};
use crate::utils::error::{MigratorError, Result};

/// Reads legacy documents, migrates them, and writes a preview and a report.
/// Documents are written back only when `apply` is enabled.
pub struct MigratePipeline<D: DocumentStore, S: Storage> {
    pub(crate) store: D,
    pub(crate) storage: S,
    pub(crate) config: TomlConfig,
}

impl<D: DocumentStore, S: Storage> MigratePipeline<D, S> {
    pub fn new(store: D, storage: S, config: TomlConfig) -> Self {
        Self {
            store,
            storage,
            config,
        }
    }

    /// First of `name`, `name-1`, `name-2`… not already in storage.
    fn unused_name(&self, name: String) -> String {
        if !self.storage.exists(&name) {
            return name;
        }

        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) => (stem.to_string(), format!(".{}", ext)),
            None => (name.clone(), String::new()),
        };
        (1..)
            .map(|n| format!("{}-{}{}", stem, n, ext))
            .find(|candidate| !self.storage.exists(candidate))
            .unwrap_or(name)
    }

    fn report_csv(outcomes: &[DocumentOutcome]) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record([
            "path",
            "status",
            "semesters",
            "course_entries",
            "unmapped_fields",
        ])?;

        for outcome in outcomes {
            writer.write_record([
                outcome.path.as_str(),
                outcome.status.as_str(),
                outcome.semesters.join(";").as_str(),
                outcome.course_entries.to_string().as_str(),
                outcome.unmapped_fields.join(";").as_str(),
            ])?;
        }

        writer
            .into_inner()
            .map_err(|e| MigratorError::IoError(e.into_error()))
    }
}

#[async_trait::async_trait]
impl<D: DocumentStore, S: Storage> Pipeline for MigratePipeline<D, S> {
    async fn extract(&self) -> Result<Vec<Record>> {
        match &self.config.migrate.document {
            Some(path) => {
                tracing::info!("🎯 Migrating single document: {}", path);
                match self.store.get_document(path).await? {
                    Some(record) => Ok(vec![record]),
                    None => Err(MigratorError::ConfigError {
                        message: format!("document {} does not exist", path),
                    }),
                }
            }
            None => {
                tracing::info!("🚀 Migrating collection: {}", self.config.collection());
                self.store.list_documents(self.config.collection()).await
            }
        }
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        let mut processed_records = Vec::new();
        let mut outcomes = Vec::new();

        for record in &data {
            if !is_legacy_shape(&record.data) {
                tracing::debug!("Skipping {}: no legacy fields", record.path);
                outcomes.push(DocumentOutcome {
                    path: record.path.clone(),
                    status: MigrationStatus::Skipped,
                    semesters: Vec::new(),
                    course_entries: 0,
                    unmapped_fields: Vec::new(),
                });
                continue;
            }

            if has_migrated_fields(&record.data) {
                tracing::warn!(
                    "⚠️ {}: has both legacy and migrated fields, leaving it untouched",
                    record.path
                );
                outcomes.push(DocumentOutcome {
                    path: record.path.clone(),
                    status: MigrationStatus::MixedShape,
                    semesters: Vec::new(),
                    course_entries: 0,
                    unmapped_fields: Vec::new(),
                });
                continue;
            }

            let migration =
                migrate_document(&record.data).map_err(|e| MigratorError::DocumentFailed {
                    path: record.path.clone(),
                    source: Box::new(e),
                })?;

            let unmapped_fields = migration.unmapped_fields();
            if !unmapped_fields.is_empty() {
                tracing::warn!(
                    "⚠️ {}: dropping unmapped fields {:?}",
                    record.path,
                    unmapped_fields
                );
            }

            outcomes.push(DocumentOutcome {
                path: record.path.clone(),
                status: MigrationStatus::Migrated,
                course_entries: migration.course_entries(),
                semesters: migration.semesters.clone(),
                unmapped_fields,
            });
            processed_records.push(Record::new(record.path.clone(), migration.document));
        }

        tracing::info!(
            "✅ {} migrated, {} left untouched",
            processed_records.len(),
            outcomes.len() - processed_records.len()
        );

        Ok(TransformResult {
            processed_records,
            source_records: data,
            outcomes,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let preview_name = self.config.preview_filename();
        let preview = encode_backup(&backup_map(&result.processed_records))?;
        self.storage.write_file(preview_name, &preview).await?;

        let report_name = self.config.report_filename();
        let report = Self::report_csv(&result.outcomes)?;
        self.storage.write_file(report_name, &report).await?;
        tracing::info!("📝 Report written to {}", self.storage.location(report_name));

        if !self.config.apply_enabled() {
            tracing::info!("🔍 Dry run: store left untouched (use --apply to write back)");
            return Ok(self.storage.location(preview_name));
        }

        if self.config.backup_before_apply() {
            let originals: Vec<Record> = result
                .source_records
                .iter()
                .filter(|source| {
                    result
                        .processed_records
                        .iter()
                        .any(|migrated| migrated.path == source.path)
                })
                .cloned()
                .collect();
            let backup = encode_backup(&backup_map(&originals))?;
            let backup_name = self.unused_name(self.config.pre_migration_backup_filename());
            self.storage.write_file(&backup_name, &backup).await?;
            tracing::info!(
                "💾 Originals saved to {}",
                self.storage.location(&backup_name)
            );
        }

        for record in &result.processed_records {
            self.store.set_document(record).await?;
            tracing::info!("✍️ Wrote {}", record.path);
        }

        Ok(self.storage.location(preview_name))
    }
}
