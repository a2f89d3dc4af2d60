//! Notification delivery through a hosted endpoint.
//!
//! The endpoint owns the email provider credentials; this client only
//! posts the payload and reads back `{success, data | error}`.

use async_trait::async_trait;
use serde::Deserialize;

use super::{NotificationPayload, NotificationTransport, NotifyError};
use crate::http::error_message;

#[derive(Debug, Deserialize)]
struct EndpointResponse {
    success: bool,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Posts notifications to the configured endpoint.
#[derive(Debug, Clone)]
pub struct HttpNotificationTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpNotificationTransport {
    /// Create a transport posting to `endpoint`.
    #[must_use]
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

fn describe(error: Option<serde_json::Value>) -> String {
    match error {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Null) | None => "provider reported failure".to_string(),
        Some(other) => error_message(&other.to_string()),
    }
}

#[async_trait]
impl NotificationTransport for HttpNotificationTransport {
    async fn deliver(
        &self,
        payload: &NotificationPayload,
    ) -> Result<serde_json::Value, NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| NotifyError::Unreachable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NotifyError::Unreachable(e.to_string()))?;
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let parsed: EndpointResponse = serde_json::from_str(&body)
            .map_err(|e| NotifyError::Provider(format!("unreadable response: {e}")))?;
        if parsed.success {
            Ok(parsed.data)
        } else {
            Err(NotifyError::Provider(describe(parsed.error)))
        }
    }
}
