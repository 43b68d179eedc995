pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::cli::CliArgs;

pub use crate::adapters::backup_file::BackupFileStore;
pub use crate::adapters::firestore::{FirestoreConnection, FirestoreSettings};
pub use crate::adapters::storage::LocalStorage;
pub use crate::app::pipelines::{BackupPipeline, MigratePipeline};
pub use crate::config::TomlConfig;
pub use crate::core::etl::EtlEngine;
pub use crate::core::migrate::{migrate, migrate_document, Migration};
pub use crate::domain::model::Record;
pub use crate::utils::error::{MigratorError, Result};
