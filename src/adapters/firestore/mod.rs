//! Firestore REST v1 document store.

pub mod value;

use crate::core::{DocumentStore, Record};
use crate::utils::error::{MigratorError, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use value::{fields_from_json, fields_to_json, FirestoreDocument, ListDocumentsResponse};

pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com";
pub const DEFAULT_DATABASE: &str = "(default)";

/// Everything needed to reach one Firestore database.
#[derive(Debug, Clone)]
pub struct FirestoreSettings {
    pub base_url: String,
    pub project_id: String,
    pub database: String,
    pub access_token: String,
    pub page_size: usize,
    pub timeout: Duration,
}

impl FirestoreSettings {
    fn documents_root(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.project_id, self.database
        )
    }
}

/// An open connection; released when dropped or closed.
pub struct FirestoreConnection {
    client: Client,
    settings: FirestoreSettings,
}

impl FirestoreConnection {
    pub fn open(settings: FirestoreSettings) -> Result<Self> {
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", settings.access_token))
            .map_err(|_| MigratorError::InvalidConfigValueError {
                field: "store.access_token".to_string(),
                value: "<redacted>".to_string(),
                reason: "Token contains characters not allowed in an HTTP header".to_string(),
            })?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()?;

        tracing::info!(
            "🔌 Opened Firestore connection to project {} (database {})",
            settings.project_id,
            settings.database
        );

        Ok(Self { client, settings })
    }

    pub fn close(self) {
        drop(self);
    }

    fn document_url(&self, path: &str) -> String {
        format!(
            "{}/v1/{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.documents_root(),
            path.trim_matches('/')
        )
    }

    /// `projects/p/databases/d/documents/users/abc` → `users/abc`.
    fn relative_path<'a>(&self, name: &'a str) -> &'a str {
        let root = self.settings.documents_root();
        name.strip_prefix(root.as_str())
            .map(|rest| rest.trim_start_matches('/'))
            .unwrap_or(name)
    }

    fn to_record(&self, document: FirestoreDocument) -> Result<Record> {
        let data = fields_to_json(&document.fields)?;
        Ok(Record::new(self.relative_path(&document.name), data))
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(MigratorError::StoreError {
            status: status.as_u16(),
            message,
        })
    }
}

impl Drop for FirestoreConnection {
    fn drop(&mut self) {
        tracing::debug!(
            "Released Firestore connection to project {}",
            self.settings.project_id
        );
    }
}

impl DocumentStore for FirestoreConnection {
    async fn list_documents(&self, collection: &str) -> Result<Vec<Record>> {
        let url = self.document_url(collection);
        let page_size = self.settings.page_size.to_string();
        let mut page_token: Option<String> = None;
        let mut records = Vec::new();

        loop {
            let mut request = self
                .client
                .get(&url)
                .query(&[("pageSize", page_size.as_str())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            tracing::debug!("Listing {} (page token: {:?})", collection, page_token);
            let response = Self::check(request.send().await?).await?;
            let page: ListDocumentsResponse = response.json().await?;

            for document in page.documents {
                records.push(self.to_record(document)?);
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!("Listed {} documents from {}", records.len(), collection);
        Ok(records)
    }

    async fn get_document(&self, path: &str) -> Result<Option<Record>> {
        let response = self.client.get(self.document_url(path)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let document: FirestoreDocument = Self::check(response).await?.json().await?;
        self.to_record(document).map(Some)
    }

    async fn set_document(&self, record: &Record) -> Result<()> {
        let body = FirestoreDocument {
            name: String::new(),
            fields: fields_from_json(&record.data),
            create_time: None,
            update_time: None,
        };

        // No updateMask: the stored document is replaced, not merged.
        let response = self
            .client
            .patch(self.document_url(&record.path))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;

        tracing::debug!("Wrote {}", record.path);
        Ok(())
    }
}
