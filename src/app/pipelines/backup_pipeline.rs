use crate::adapters::backup_file::encode_backup;
use crate::config::toml_config::TomlConfig;
use crate::core::{DocumentStore, Pipeline, Record, Storage, TransformResult};
use crate::utils::error::Result;
use serde_json::{Map, Value};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

/// Dumps a collection to `backup.json` (path → document).
pub struct BackupPipeline<D: DocumentStore, S: Storage> {
    pub(crate) store: D,
    pub(crate) storage: S,
    pub(crate) config: TomlConfig,
}

impl<D: DocumentStore, S: Storage> BackupPipeline<D, S> {
    pub fn new(store: D, storage: S, config: TomlConfig) -> Self {
        Self {
            store,
            storage,
            config,
        }
    }
}

/// Path → document map, the on-disk backup layout.
pub fn backup_map(records: &[Record]) -> Map<String, Value> {
    records
        .iter()
        .map(|record| (record.path.clone(), Value::Object(record.data.clone())))
        .collect()
}

#[async_trait::async_trait]
impl<D: DocumentStore, S: Storage> Pipeline for BackupPipeline<D, S> {
    async fn extract(&self) -> Result<Vec<Record>> {
        tracing::info!("💾 Backing up collection: {}", self.config.collection());
        self.store.list_documents(self.config.collection()).await
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        Ok(TransformResult {
            source_records: data.clone(),
            processed_records: data,
            outcomes: Vec::new(),
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let json_name = self.config.backup_filename();
        let json_data = encode_backup(&backup_map(&result.processed_records))?;

        if !self.config.compression_enabled() {
            tracing::debug!("Writing backup ({} bytes)", json_data.len());
            self.storage.write_file(&json_name, &json_data).await?;
            return Ok(self.storage.location(&json_name));
        }

        let archive_name = self.config.backup_archive_filename();
        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
            zip.start_file::<_, ()>(json_name.as_str(), FileOptions::default())?;
            zip.write_all(&json_data)?;
            zip.finish()?.into_inner()
        };

        tracing::debug!("Writing compressed backup ({} bytes)", zip_data.len());
        self.storage.write_file(&archive_name, &zip_data).await?;
        Ok(self.storage.location(&archive_name))
    }
}
