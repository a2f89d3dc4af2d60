//! Record store over an Airtable-style REST API.

use async_trait::async_trait;
use reqwest::Url;
use serde_json::json;
use tracing::{debug, info};

use super::{CreatedRecord, RecordError, RecordFields, RecordStore};
use crate::error::{Error, Result};
use crate::http::error_message;
use crate::submission::CompleteSubmission;

/// Record store that creates one row per submission in a table.
#[derive(Debug, Clone)]
pub struct AirtableRecordStore {
    client: reqwest::Client,
    table_url: Url,
    api_key: String,
}

impl AirtableRecordStore {
    /// Create a client for `table` in base `base_id`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `base_url` is not an absolute URL.
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        base_id: &str,
        table: &str,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let mut table_url = Url::parse(base_url).map_err(|e| {
            Error::config_validation(format!("records.base_url {base_url:?} is invalid: {e}"))
        })?;
        table_url
            .path_segments_mut()
            .map_err(|()| {
                Error::config_validation(format!("records.base_url {base_url:?} cannot be a base"))
            })?
            .pop_if_empty()
            .push(base_id)
            .push(table);
        Ok(Self {
            client,
            table_url,
            api_key: api_key.into(),
        })
    }

    /// Endpoint records are created at.
    #[must_use]
    pub fn table_url(&self) -> &Url {
        &self.table_url
    }
}

#[async_trait]
impl RecordStore for AirtableRecordStore {
    async fn insert(
        &self,
        submission: &CompleteSubmission,
    ) -> std::result::Result<CreatedRecord, RecordError> {
        let fields = RecordFields::from(submission);
        debug!(form_id = %submission.form_id(), "Creating record");

        let response = self
            .client
            .post(self.table_url.clone())
            .bearer_auth(&self.api_key)
            .json(&json!({ "fields": fields }))
            .send()
            .await
            .map_err(|e| RecordError::Unavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RecordError::Unavailable(e.to_string()))?;
        if !status.is_success() {
            return Err(RecordError::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let record: CreatedRecord = serde_json::from_str(&body)
            .map_err(|e| RecordError::Unavailable(format!("unreadable response: {e}")))?;
        info!(form_id = %submission.form_id(), record_id = %record.id, "Record created");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_url_encodes_segments() {
        let store = AirtableRecordStore::new(
            reqwest::Client::new(),
            "https://api.airtable.com/v0/",
            "appXYZ",
            "Signed Waivers",
            "key",
        )
        .unwrap();
        assert_eq!(
            store.table_url().as_str(),
            "https://api.airtable.com/v0/appXYZ/Signed%20Waivers"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = AirtableRecordStore::new(reqwest::Client::new(), "not a url", "a", "b", "k")
            .unwrap_err();
        assert!(err.is_config_error());
    }
}
