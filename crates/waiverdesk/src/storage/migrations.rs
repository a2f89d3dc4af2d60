//! Schema versioning for the queue database.
//!
//! The version lives in the `metadata` table. Opening a database creates
//! any missing tables, then applies each migration above the stored
//! version in order.

use rusqlite::{Connection, OptionalExtension};

use crate::error::{Error, Result};

use super::schema::SCHEMA_STATEMENTS;

/// The current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Versioned migration steps, applied in order. Version 1 is the base
/// schema created by [`SCHEMA_STATEMENTS`].
const MIGRATIONS: &[(i32, &str)] = &[(1, "")];

/// Create the schema if needed and bring it up to [`CURRENT_VERSION`].
///
/// # Errors
///
/// Returns an error if schema creation or a migration fails, or if the
/// database was written by a newer version.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let version = schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }
    for &(target, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > version) {
        if !sql.is_empty() {
            conn.execute_batch(sql).map_err(|e| Error::DatabaseMigration {
                message: format!("migration to version {target} failed: {e}"),
            })?;
        }
        set_schema_version(conn, target)?;
    }
    Ok(())
}

/// Stored schema version, or 0 for a fresh database.
///
/// # Errors
///
/// Returns an error if the metadata table cannot be read or holds garbage.
pub fn schema_version(conn: &Connection) -> Result<i32> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    match value {
        None => Ok(0),
        Some(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}
