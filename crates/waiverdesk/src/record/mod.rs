//! Submission records in the structured record store.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::AirtableRecordStore;

use crate::submission::CompleteSubmission;

/// Errors raised by the record store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The store answered with an error status.
    #[error("record store rejected the record ({status}): {message}")]
    Rejected {
        /// HTTP status.
        status: u16,
        /// Message reported by the store.
        message: String,
    },

    /// The store could not be reached or answered unintelligibly.
    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

impl RecordError {
    /// HTTP status, when the store answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Unavailable(_) => None,
        }
    }
}

/// Column values written for one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFields {
    /// Guest full name.
    #[serde(rename = "Guest Name")]
    pub guest_name: String,
    /// Driver's license number.
    #[serde(rename = "License Number")]
    pub license_number: String,
    /// License issuing state.
    #[serde(rename = "Issuing State")]
    pub issuing_state: String,
    /// Postal address.
    #[serde(rename = "Address")]
    pub address: String,
    /// ISO date, `YYYY-MM-DD`.
    #[serde(rename = "Signature Date")]
    pub signature_date: String,
    /// Form identifier.
    #[serde(rename = "Form ID")]
    pub form_id: String,
    /// Public address of the signed waiver.
    #[serde(rename = "PDF Link")]
    pub pdf_link: String,
}

impl From<&CompleteSubmission> for RecordFields {
    fn from(complete: &CompleteSubmission) -> Self {
        let fields = complete.fields();
        Self {
            guest_name: fields.guest_name.clone(),
            license_number: fields.license_number.clone(),
            issuing_state: fields.issuing_state.clone(),
            address: fields.address.clone(),
            signature_date: fields.signature_date.format("%Y-%m-%d").to_string(),
            form_id: complete.form_id().to_string(),
            pdf_link: complete.artifact_url.clone(),
        }
    }
}

/// A record as confirmed by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedRecord {
    /// Store-assigned identifier.
    pub id: String,
    /// Creation timestamp as reported by the store.
    #[serde(rename = "createdTime", default)]
    pub created_time: String,
    /// Field values echoed back by the store.
    #[serde(default)]
    pub fields: serde_json::Value,
}

/// Destination for submission records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create one record for a completed submission.
    ///
    /// Called at most once per submission; failures are not retried.
    async fn insert(&self, submission: &CompleteSubmission) -> Result<CreatedRecord, RecordError>;
}
