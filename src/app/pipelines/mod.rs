pub mod backup_pipeline;
pub mod migrate_pipeline;

pub use backup_pipeline::BackupPipeline;
pub use migrate_pipeline::MigratePipeline;
