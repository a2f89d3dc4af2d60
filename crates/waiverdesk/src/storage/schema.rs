//! `SQLite` schema for the pending-notification queue.

/// SQL statement to create the pending notifications table.
pub const CREATE_PENDING_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS pending_notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    payload TEXT NOT NULL,
    payload_hash TEXT NOT NULL UNIQUE,
    enqueued_at TEXT NOT NULL,
    attempts INTEGER NOT NULL DEFAULT 1,
    last_error TEXT
)
";

/// Index supporting age-based pruning.
pub const CREATE_ENQUEUED_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_pending_enqueued ON pending_notifications(enqueued_at)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_PENDING_TABLE,
    CREATE_ENQUEUED_INDEX,
    CREATE_METADATA_TABLE,
];
