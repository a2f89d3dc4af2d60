//! Submission notifications.
//!
//! [`Notifier::send`] tries to deliver a notification once and, if that
//! fails, parks the payload in a [`PendingQueue`]. It never fails itself:
//! a submission whose email is still pending is a successful submission.
//! [`Notifier::retry_pending`] walks the queue and removes each entry only
//! once its delivery is confirmed.

pub mod http;
pub mod queue;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub use http::HttpNotificationTransport;
pub use queue::{MemoryQueue, PendingQueue, QueuedNotification};

use crate::error::Result;
use crate::submission::CompleteSubmission;

/// Errors raised while delivering a notification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The endpoint could not be reached.
    #[error("notification endpoint unreachable: {0}")]
    Unreachable(String),

    /// The endpoint answered with an error status.
    #[error("notification endpoint returned {status}: {message}")]
    Rejected {
        /// HTTP status.
        status: u16,
        /// Message reported by the endpoint.
        message: String,
    },

    /// The endpoint accepted the request but the provider failed to send.
    #[error("notification provider failed: {0}")]
    Provider(String),
}

/// Submission details included in a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormData {
    /// Guest full name.
    pub guest_name: String,
    /// Driver's license number.
    pub license_number: String,
    /// License issuing state.
    pub issuing_state: String,
    /// Postal address.
    pub address: String,
    /// ISO signature date.
    pub signature_date: String,
    /// Form identifier.
    pub form_id: String,
    /// RFC 3339 submission time.
    pub submitted_at: String,
}

/// Body posted to the notification endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    /// The submitted fields.
    pub form_data: FormData,
    /// Public address of the signed waiver.
    pub pdf_link: String,
    /// Recipient override, used for test deployments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl NotificationPayload {
    /// Build the payload for a completed submission.
    #[must_use]
    pub fn for_submission(complete: &CompleteSubmission, to: Option<String>) -> Self {
        let fields = complete.fields();
        Self {
            form_data: FormData {
                guest_name: fields.guest_name.clone(),
                license_number: fields.license_number.clone(),
                issuing_state: fields.issuing_state.clone(),
                address: fields.address.clone(),
                signature_date: fields.signature_date.format("%Y-%m-%d").to_string(),
                form_id: complete.form_id().to_string(),
                submitted_at: complete
                    .submission
                    .submitted_at
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            },
            pdf_link: complete.artifact_url.clone(),
            to,
        }
    }
}

/// Delivery channel for notifications.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Deliver one payload, returning the provider's response data.
    async fn deliver(
        &self,
        payload: &NotificationPayload,
    ) -> std::result::Result<serde_json::Value, NotifyError>;
}

/// Result of [`Notifier::send`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotifyOutcome {
    /// Whether the notification was delivered now.
    pub success: bool,
    /// Provider response data on success.
    pub data: Option<serde_json::Value>,
    /// Delivery error on failure.
    pub error: Option<String>,
    /// Queue entry holding the payload for a later attempt.
    pub queued_id: Option<i64>,
}

impl NotifyOutcome {
    /// Whether the notification is waiting in the queue.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.success && self.queued_id.is_some()
    }
}

/// Totals from one pass over the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Entries dropped for being too old.
    pub pruned: usize,
    /// Entries a delivery was attempted for.
    pub attempted: usize,
    /// Entries delivered and removed.
    pub sent: usize,
    /// Entries that failed again and stay queued.
    pub failed: usize,
    /// Entries left in the queue afterwards.
    pub remaining: usize,
}

/// Sends notifications, falling back to the pending queue.
#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn NotificationTransport>,
    queue: Arc<dyn PendingQueue>,
    recipient: Option<String>,
    max_age: Option<Duration>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("recipient", &self.recipient)
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

impl Notifier {
    /// Create a notifier with no recipient override and no queue expiry.
    #[must_use]
    pub fn new(transport: Arc<dyn NotificationTransport>, queue: Arc<dyn PendingQueue>) -> Self {
        Self {
            transport,
            queue,
            recipient: None,
            max_age: None,
        }
    }

    /// Send every notification to `recipient`.
    #[must_use]
    pub fn with_recipient(mut self, recipient: Option<String>) -> Self {
        self.recipient = recipient.filter(|r| !r.trim().is_empty());
        self
    }

    /// Drop queued entries older than `max_age` at the start of each sweep.
    #[must_use]
    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    /// The pending queue.
    #[must_use]
    pub fn queue(&self) -> &Arc<dyn PendingQueue> {
        &self.queue
    }

    /// The payload that would be sent for `complete`.
    #[must_use]
    pub fn payload_for(&self, complete: &CompleteSubmission) -> NotificationPayload {
        NotificationPayload::for_submission(complete, self.recipient.clone())
    }

    /// Deliver a notification for `complete`, queueing it on failure.
    pub async fn send(&self, complete: &CompleteSubmission) -> NotifyOutcome {
        let payload = self.payload_for(complete);
        match self.transport.deliver(&payload).await {
            Ok(data) => {
                info!(form_id = %complete.form_id(), "Notification sent");
                NotifyOutcome {
                    success: true,
                    data: Some(data),
                    error: None,
                    queued_id: None,
                }
            }
            Err(e) => {
                warn!(form_id = %complete.form_id(), error = %e, "Notification failed, queueing");
                let queued_id = match self.queue.append(&payload, &e.to_string()) {
                    Ok(id) => Some(id),
                    Err(queue_err) => {
                        error!(
                            form_id = %complete.form_id(),
                            error = %queue_err,
                            "Could not queue notification"
                        );
                        None
                    }
                };
                NotifyOutcome {
                    success: false,
                    data: None,
                    error: Some(e.to_string()),
                    queued_id,
                }
            }
        }
    }

    /// Try to deliver every queued notification, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be read or updated. Delivery
    /// failures are counted in the report, not returned.
    pub async fn retry_pending(&self) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        if let Some(max_age) = self.max_age {
            report.pruned = self.queue.prune_older_than(Utc::now() - max_age)?;
            if report.pruned > 0 {
                warn!(count = report.pruned, "Dropped expired notifications");
            }
        }

        for entry in self.queue.list()? {
            report.attempted += 1;
            match self.transport.deliver(&entry.payload).await {
                Ok(_) => {
                    self.queue.remove(entry.id)?;
                    report.sent += 1;
                    info!(
                        id = entry.id,
                        form_id = %entry.payload.form_data.form_id,
                        "Queued notification sent"
                    );
                }
                Err(e) => {
                    self.queue.record_failure(entry.id, &e.to_string())?;
                    report.failed += 1;
                    debug!(
                        id = entry.id,
                        attempts = entry.attempts + 1,
                        error = %e,
                        "Queued notification failed again"
                    );
                }
            }
        }

        report.remaining = self.queue.len()?;
        if report.attempted > 0 {
            info!(
                sent = report.sent,
                failed = report.failed,
                remaining = report.remaining,
                "Notification sweep finished"
            );
        }
        Ok(report)
    }
}
