//! Durable queue of notifications that could not be delivered.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::NotificationPayload;
use crate::error::{Error, Result};

/// A notification waiting to be resent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedNotification {
    /// Queue-assigned identifier.
    pub id: i64,
    /// The payload to resend.
    pub payload: NotificationPayload,
    /// BLAKE3 hex digest of the serialized payload.
    pub payload_hash: String,
    /// When the payload was first queued.
    pub enqueued_at: DateTime<Utc>,
    /// Delivery attempts made so far, including the original send.
    pub attempts: u32,
    /// Most recent delivery error.
    pub last_error: Option<String>,
}

/// Digest identifying a payload in the queue.
///
/// # Errors
///
/// Returns an error if the payload cannot be serialized.
pub fn payload_hash(payload: &NotificationPayload) -> Result<String> {
    let bytes = serde_json::to_vec(payload)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Storage for undelivered notifications.
///
/// Every method is atomic with respect to the others, so a resend sweep
/// and a fresh submission can share one queue.
pub trait PendingQueue: Send + Sync {
    /// Queue `payload` after a failed first attempt with `error`.
    ///
    /// Returns the entry id. A payload already in the queue is not added
    /// twice; its existing id is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be written.
    fn append(&self, payload: &NotificationPayload, error: &str) -> Result<i64>;

    /// All entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be read.
    fn list(&self) -> Result<Vec<QueuedNotification>>;

    /// Remove an entry after successful delivery.
    ///
    /// Returns `false` if no entry had that id.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be written.
    fn remove(&self, id: i64) -> Result<bool>;

    /// Count another failed attempt for an entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be written.
    fn record_failure(&self, id: i64, error: &str) -> Result<()>;

    /// Drop entries queued before `cutoff`, returning how many were dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be written.
    fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    /// Drop every entry, returning how many were dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be written.
    fn clear(&self) -> Result<usize>;

    /// Number of entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be read.
    fn len(&self) -> Result<usize>;

    /// Whether the queue is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be read.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    entries: Vec<QueuedNotification>,
}

/// In-process queue, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    state: Mutex<MemoryState>,
}

impl MemoryQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> Result<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::internal("pending queue lock poisoned"))?;
        Ok(f(&mut state))
    }
}

impl PendingQueue for MemoryQueue {
    fn append(&self, payload: &NotificationPayload, error: &str) -> Result<i64> {
        let hash = payload_hash(payload)?;
        self.with_state(|state| {
            if let Some(existing) = state.entries.iter().find(|e| e.payload_hash == hash) {
                debug!(id = existing.id, "Payload already queued");
                return existing.id;
            }
            state.next_id += 1;
            let id = state.next_id;
            state.entries.push(QueuedNotification {
                id,
                payload: payload.clone(),
                payload_hash: hash,
                enqueued_at: Utc::now(),
                attempts: 1,
                last_error: Some(error.to_string()),
            });
            id
        })
    }

    fn list(&self) -> Result<Vec<QueuedNotification>> {
        self.with_state(|state| state.entries.clone())
    }

    fn remove(&self, id: i64) -> Result<bool> {
        self.with_state(|state| {
            let before = state.entries.len();
            state.entries.retain(|e| e.id != id);
            state.entries.len() != before
        })
    }

    fn record_failure(&self, id: i64, error: &str) -> Result<()> {
        self.with_state(|state| {
            if let Some(entry) = state.entries.iter_mut().find(|e| e.id == id) {
                entry.attempts += 1;
                entry.last_error = Some(error.to_string());
            }
        })
    }

    fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.with_state(|state| {
            let before = state.entries.len();
            state.entries.retain(|e| e.enqueued_at >= cutoff);
            before - state.entries.len()
        })
    }

    fn clear(&self) -> Result<usize> {
        self.with_state(|state| {
            let count = state.entries.len();
            state.entries.clear();
            count
        })
    }

    fn len(&self) -> Result<usize> {
        self.with_state(|state| state.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::notify::FormData;

    fn payload(name: &str) -> NotificationPayload {
        NotificationPayload {
            form_data: FormData {
                guest_name: name.to_string(),
                license_number: "X123".to_string(),
                issuing_state: "CA".to_string(),
                address: "1 Main St".to_string(),
                signature_date: "2026-10-19".to_string(),
                form_id: format!("{name}-01"),
                submitted_at: "2026-10-19T09:00:00Z".to_string(),
            },
            pdf_link: format!("https://store.test/{name}.pdf"),
            to: None,
        }
    }

    #[test]
    fn test_append_and_list_in_order() {
        let queue = MemoryQueue::new();
        let a = queue.append(&payload("a"), "timeout").unwrap();
        let b = queue.append(&payload("b"), "timeout").unwrap();

        let entries = queue.list().unwrap();
        assert_eq!(entries.iter().map(|e| e.id).collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(entries[0].attempts, 1);
        assert_eq!(entries[0].last_error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_duplicate_payload_not_queued_twice() {
        let queue = MemoryQueue::new();
        let first = queue.append(&payload("a"), "timeout").unwrap();
        let second = queue.append(&payload("a"), "timeout again").unwrap();

        assert_eq!(first, second);
        assert_eq!(queue.len().unwrap(), 1);
    }

    #[test]
    fn test_remove_only_named_entry() {
        let queue = MemoryQueue::new();
        let a = queue.append(&payload("a"), "e").unwrap();
        let b = queue.append(&payload("b"), "e").unwrap();

        assert!(queue.remove(a).unwrap());
        assert!(!queue.remove(a).unwrap());
        let remaining = queue.list().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, b);
    }

    #[test]
    fn test_record_failure_counts_attempts() {
        let queue = MemoryQueue::new();
        let id = queue.append(&payload("a"), "first").unwrap();
        queue.record_failure(id, "second").unwrap();

        let entry = &queue.list().unwrap()[0];
        assert_eq!(entry.attempts, 2);
        assert_eq!(entry.last_error.as_deref(), Some("second"));
    }

    #[test]
    fn test_prune_and_clear() {
        let queue = MemoryQueue::new();
        queue.append(&payload("a"), "e").unwrap();
        queue.append(&payload("b"), "e").unwrap();

        assert_eq!(queue.prune_older_than(Utc::now() - Duration::days(1)).unwrap(), 0);
        assert_eq!(queue.prune_older_than(Utc::now() + Duration::seconds(1)).unwrap(), 2);
        assert!(queue.is_empty().unwrap());

        queue.append(&payload("c"), "e").unwrap();
        assert_eq!(queue.clear().unwrap(), 1);
        assert!(queue.is_empty().unwrap());
    }

    #[test]
    fn test_payload_hash_stable() {
        assert_eq!(payload_hash(&payload("a")).unwrap(), payload_hash(&payload("a")).unwrap());
        assert_ne!(payload_hash(&payload("a")).unwrap(), payload_hash(&payload("b")).unwrap());
    }
}
