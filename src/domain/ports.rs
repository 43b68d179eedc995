use crate::domain::model::{Record, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn exists(&self, path: &str) -> bool;

    /// Human readable location of `path`, for logs and the CLI.
    fn location(&self, path: &str) -> String;
}

/// A collection-oriented document database.
pub trait DocumentStore: Send + Sync {
    /// Every document directly under `collection`.
    fn list_documents(
        &self,
        collection: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Record>>> + Send;

    fn get_document(
        &self,
        path: &str,
    ) -> impl std::future::Future<Output = Result<Option<Record>>> + Send;

    /// Replaces the whole document at `record.path`.
    fn set_document(
        &self,
        record: &Record,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Record>>;
    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
