//! A document store backed by a backup file (`{"users/<uid>": {...}, ...}`).
//!
//! Lets a migration be rehearsed offline against a dump taken with the
//! `backup` command.

use crate::core::{DocumentStore, Record};
use crate::utils::error::{MigratorError, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Serializer, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Serializes a path → document map the way backups are stored on disk:
/// four-space indentation, non-ASCII text kept as is.
pub fn encode_backup(documents: &Map<String, Value>) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    documents.serialize(&mut serializer)?;
    Ok(buffer)
}

pub fn decode_backup(bytes: &[u8]) -> Result<Map<String, Value>> {
    match serde_json::from_slice(bytes)? {
        Value::Object(documents) => Ok(documents),
        _ => Err(MigratorError::DecodeError {
            message: "backup file must contain an object keyed by document path".to_string(),
        }),
    }
}

pub struct BackupFileStore {
    path: PathBuf,
    documents: Mutex<Map<String, Value>>,
}

impl BackupFileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let documents = decode_backup(&fs::read(&path)?)?;

        if let Some((key, _)) = documents.iter().find(|(_, doc)| !doc.is_object()) {
            return Err(MigratorError::DecodeError {
                message: format!("backup entry {} is not a document", key),
            });
        }

        tracing::info!(
            "📂 Loaded {} documents from {}",
            documents.len(),
            path.display()
        );
        Ok(Self {
            path,
            documents: Mutex::new(documents),
        })
    }
}

impl DocumentStore for BackupFileStore {
    async fn list_documents(&self, collection: &str) -> Result<Vec<Record>> {
        let prefix = format!("{}/", collection.trim_matches('/'));
        let documents = self.documents.lock().await;

        let mut records: Vec<Record> = documents
            .iter()
            .filter(|(path, _)| {
                path.strip_prefix(&prefix)
                    .is_some_and(|id| !id.is_empty() && !id.contains('/'))
            })
            .filter_map(|(path, doc)| {
                doc.as_object()
                    .map(|data| Record::new(path.clone(), data.clone()))
            })
            .collect();
        records.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(records)
    }

    async fn get_document(&self, path: &str) -> Result<Option<Record>> {
        let documents = self.documents.lock().await;
        Ok(documents
            .get(path)
            .and_then(Value::as_object)
            .map(|data| Record::new(path, data.clone())))
    }

    async fn set_document(&self, record: &Record) -> Result<()> {
        let mut documents = self.documents.lock().await;
        documents.insert(record.path.clone(), Value::Object(record.data.clone()));
        fs::write(&self.path, encode_backup(&documents)?)?;
        Ok(())
    }
}
