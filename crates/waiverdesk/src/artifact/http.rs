//! Object storage over a Supabase-style storage REST API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{ArtifactStore, StoreError};
use crate::http::error_message;

/// Objects requested per listing call.
const LIST_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
struct ListedObject {
    name: String,
}

/// Artifact store backed by the storage REST API.
#[derive(Debug, Clone)]
pub struct HttpArtifactStore {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    api_key: String,
}

impl HttpArtifactStore {
    /// Create a store client for `bucket` at `base_url`.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        bucket: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            api_key: api_key.into(),
        }
    }

    /// Upload endpoint for `path`.
    #[must_use]
    pub fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{path}", self.base_url, self.bucket)
    }

    /// Public address of the object at `path`.
    #[must_use]
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{path}",
            self.base_url, self.bucket
        )
    }

    fn list_url(&self) -> String {
        format!("{}/storage/v1/object/list/{}", self.base_url, self.bucket)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
    }
}

fn transport_error(e: &reqwest::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::Transient(format!("request timed out: {e}"))
    } else {
        StoreError::Transient(e.to_string())
    }
}

fn is_missing_bucket(status: u16, message: &str) -> bool {
    status == 404 || message.to_ascii_lowercase().contains("bucket not found")
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let response = self
            .authorized(self.client.post(self.list_url()))
            .json(&json!({ "prefix": prefix, "limit": LIST_LIMIT }))
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| transport_error(&e))?;
        if !status.is_success() {
            let message = error_message(&body);
            if is_missing_bucket(status.as_u16(), &message) {
                return Err(StoreError::LocationMissing(format!(
                    "bucket {}: {message}",
                    self.bucket
                )));
            }
            return Err(StoreError::from_status(status.as_u16(), message));
        }

        let objects: Vec<ListedObject> = serde_json::from_str(&body)
            .map_err(|e| StoreError::Transient(format!("unreadable listing: {e}")))?;
        Ok(objects.into_iter().map(|o| o.name).collect())
    }

    async fn put(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StoreError> {
        debug!(path, bytes = bytes.len(), "Uploading object");
        let response = self
            .authorized(self.client.post(self.object_url(path)))
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(self.public_url(path));
        }
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);
        if is_missing_bucket(status.as_u16(), &message) {
            return Err(StoreError::LocationMissing(format!(
                "bucket {}: {message}",
                self.bucket
            )));
        }
        Err(StoreError::from_status(status.as_u16(), message))
    }
}
