//! Storage layer for waiverdesk.
//!
//! This module provides the `SQLite`-backed [`PendingQueue`] that keeps
//! undelivered notifications across restarts.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::notify::queue::payload_hash;
use crate::notify::{NotificationPayload, PendingQueue, QueuedNotification};

const SELECT_COLUMNS: &str =
    "SELECT id, payload, payload_hash, enqueued_at, attempts, last_error FROM pending_notifications";

/// Fixed-width timestamp so stored values order lexically.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Durable pending-notification queue.
///
/// All access goes through one mutex-guarded connection, so every queue
/// operation is atomic with respect to the others.
#[derive(Debug)]
pub struct SqliteQueue {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl SqliteQueue {
    /// Open or create a queue database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening queue database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Queue database opened at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory queue for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("queue database lock poisoned"))
    }

    /// Get a queued notification by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: i64) -> Result<Option<QueuedNotification>> {
        let entry = self
            .conn()?
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                [id],
                Self::row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    /// Summary of the queue contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<QueueStats> {
        let conn = self.conn()?;
        let (pending, oldest): (i64, Option<String>) = conn.query_row(
            "SELECT COUNT(*), MIN(enqueued_at) FROM pending_notifications",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        drop(conn);

        let oldest_entry = oldest
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(QueueStats {
            pending: usize::try_from(pending).unwrap_or(0),
            oldest_entry,
            db_size_bytes,
        })
    }

    /// Convert a database row to a queue entry.
    fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<QueuedNotification> {
        let payload_json: String = row.get(1)?;
        let enqueued_str: String = row.get(3)?;

        let payload: NotificationPayload = serde_json::from_str(&payload_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let enqueued_at = DateTime::parse_from_rfc3339(&enqueued_str).map_or_else(
            |_| {
                warn!("Unreadable enqueue time {}, using now", enqueued_str);
                Utc::now()
            },
            |dt| dt.with_timezone(&Utc),
        );

        Ok(QueuedNotification {
            id: row.get(0)?,
            payload,
            payload_hash: row.get(2)?,
            enqueued_at,
            attempts: row.get(4)?,
            last_error: row.get(5)?,
        })
    }
}

impl PendingQueue for SqliteQueue {
    fn append(&self, payload: &NotificationPayload, error: &str) -> Result<i64> {
        let hash = payload_hash(payload)?;
        let json = serde_json::to_string(payload)?;
        let conn = self.conn()?;

        let inserted = conn.execute(
            r"
            INSERT OR IGNORE INTO pending_notifications
                (payload, payload_hash, enqueued_at, attempts, last_error)
            VALUES (?1, ?2, ?3, 1, ?4)
            ",
            params![json, hash, timestamp(Utc::now()), error],
        )?;
        let id: i64 = conn.query_row(
            "SELECT id FROM pending_notifications WHERE payload_hash = ?1",
            [&hash],
            |row| row.get(0),
        )?;

        if inserted == 0 {
            debug!(id, "Payload already queued");
        } else {
            debug!(id, "Queued notification");
        }
        Ok(id)
    }

    /// Rows whose payload no longer decodes are logged and skipped. They
    /// stay counted by `len` until age pruning or `clear` removes them.
    fn list(&self) -> Result<Vec<QueuedNotification>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id ASC"))?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            match Self::row_to_entry(row) {
                Ok(entry) => entries.push(entry),
                Err(rusqlite::Error::FromSqlConversionFailure(_, _, e)) => {
                    let id: i64 = row.get(0)?;
                    warn!(id, error = %e, "Skipping unreadable queued notification");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(entries)
    }

    fn remove(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn()?
            .execute("DELETE FROM pending_notifications WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    fn record_failure(&self, id: i64, error: &str) -> Result<()> {
        self.conn()?.execute(
            "UPDATE pending_notifications SET attempts = attempts + 1, last_error = ?2 WHERE id = ?1",
            params![id, error],
        )?;
        Ok(())
    }

    fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let affected = self.conn()?.execute(
            "DELETE FROM pending_notifications WHERE enqueued_at < ?1",
            [timestamp(cutoff)],
        )?;
        if affected > 0 {
            info!("Pruned {} expired notifications", affected);
        }
        Ok(affected)
    }

    fn clear(&self) -> Result<usize> {
        let affected = self.conn()?.execute("DELETE FROM pending_notifications", [])?;
        Ok(affected)
    }

    fn len(&self) -> Result<usize> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM pending_notifications",
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

/// Statistics about the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStats {
    /// Number of queued notifications.
    pub pending: usize,
    /// When the oldest entry was queued.
    pub oldest_entry: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tempfile::TempDir;

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
            to: Some("desk@test".to_string()),
        }
    }

    fn create_test_queue() -> SqliteQueue {
        SqliteQueue::open_in_memory().expect("failed to create test queue")
    }

    #[test]
    fn test_append_and_list() {
        let queue = create_test_queue();
        let a = queue.append(&payload("a"), "timeout").unwrap();
        let b = queue.append(&payload("b"), "refused").unwrap();

        let entries = queue.list().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, a);
        assert_eq!(entries[1].id, b);
        assert_eq!(entries[0].payload, payload("a"));
        assert_eq!(entries[1].last_error.as_deref(), Some("refused"));
        assert_eq!(entries[0].attempts, 1);
    }

    #[test]
    fn test_append_deduplicates() {
        let queue = create_test_queue();
        let first = queue.append(&payload("a"), "timeout").unwrap();
        let second = queue.append(&payload("a"), "timeout").unwrap();

        assert_eq!(first, second);
        assert_eq!(queue.len().unwrap(), 1);
    }

    fn insert_raw(queue: &SqliteQueue, payload: &str, hash: &str) -> i64 {
        let conn = queue.conn().unwrap();
        conn.execute(
            "INSERT INTO pending_notifications (payload, payload_hash, enqueued_at) \
             VALUES (?1, ?2, ?3)",
            params![payload, hash, timestamp(Utc::now())],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    #[test]
    fn test_list_skips_unreadable_payloads() {
        let queue = create_test_queue();
        let stale = insert_raw(&queue, r#"{"old":1}"#, "stale");
        let good = queue.append(&payload("a"), "timeout").unwrap();
        insert_raw(&queue, "not json", "garbled");

        let entries = queue.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, good);
        assert_eq!(entries[0].payload, payload("a"));

        assert_eq!(queue.len().unwrap(), 3);
        assert!(queue.get(stale).is_err());
        assert!(queue.remove(stale).unwrap());
        assert_eq!(queue.len().unwrap(), 2);
    }

    #[test]
    fn test_remove() {
        let queue = create_test_queue();
        let a = queue.append(&payload("a"), "e").unwrap();
        queue.append(&payload("b"), "e").unwrap();

        assert!(queue.remove(a).unwrap());
        assert!(!queue.remove(a).unwrap());
        assert!(queue.get(a).unwrap().is_none());
        let left = queue.list().unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].payload.form_data.guest_name, "b");
    }

    #[test]
    fn test_record_failure() {
        let queue = create_test_queue();
        let id = queue.append(&payload("a"), "first").unwrap();
        queue.record_failure(id, "second").unwrap();
        queue.record_failure(id, "third").unwrap();

        let entry = queue.get(id).unwrap().unwrap();
        assert_eq!(entry.attempts, 3);
        assert_eq!(entry.last_error.as_deref(), Some("third"));
    }

    #[test]
    fn test_prune_older_than() {
        let queue = create_test_queue();
        queue.append(&payload("a"), "e").unwrap();

        assert_eq!(queue.prune_older_than(Utc::now() - Duration::hours(1)).unwrap(), 0);
        assert_eq!(queue.prune_older_than(Utc::now() + Duration::seconds(1)).unwrap(), 1);
        assert!(queue.is_empty().unwrap());
    }

    #[test]
    fn test_clear() {
        let queue = create_test_queue();
        queue.append(&payload("a"), "e").unwrap();
        queue.append(&payload("b"), "e").unwrap();

        assert_eq!(queue.clear().unwrap(), 2);
        assert_eq!(queue.len().unwrap(), 0);
    }

    #[test]
    fn test_stats() {
        let queue = create_test_queue();
        assert_eq!(queue.stats().unwrap().pending, 0);
        assert!(queue.stats().unwrap().oldest_entry.is_none());

        queue.append(&payload("a"), "e").unwrap();
        let stats = queue.stats().unwrap();
        assert_eq!(stats.pending, 1);
        assert!(stats.oldest_entry.is_some());
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("pending.db");

        {
            let queue = SqliteQueue::open(&path).unwrap();
            queue.append(&payload("a"), "timeout").unwrap();
        }

        let queue = SqliteQueue::open(&path).unwrap();
        assert_eq!(queue.path(), path.as_path());
        let entries = queue.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].payload, payload("a"));
        assert!(queue.stats().unwrap().db_size_bytes > 0);
    }
}
