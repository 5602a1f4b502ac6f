//! # accrue-db
//!
//! Ordered key-value store for the reward engine, backed by a single SQLite
//! database at `$ACCRUE_DATA_DIR/accrue.db`.
//!
//! ## Schema
//!
//! - WAL mode mandatory
//! - Foreign keys enforced
//! - All timestamps are Unix epoch seconds (u64)
//! - Decimals are stored as their canonical 18-digit string
//! - Every key column is `TEXT` with `BINARY` collation, so `ORDER BY` on the
//!   key is lexicographic on the UTF-8 bytes and identical on every node
//! - Schema version stored in `PRAGMA user_version`
//!
//! Every query takes a `&Connection`; a `rusqlite::Transaction` derefs to
//! one, so callers group writes atomically by passing the transaction.

pub mod migrations;
pub mod queries;
pub mod schema;

use rusqlite::Connection;
use std::path::Path;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the database at the given path.
///
/// Configures WAL mode, foreign keys, and runs any pending migrations.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing and replay).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = FULL;",
    )?;
    Ok(())
}

/// Convert a stored `INTEGER` back to a timestamp.
pub(crate) fn to_timestamp(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| DbError::Serialization(format!("negative timestamp {value}")))
}

/// Convert a timestamp to a storable `INTEGER`.
pub(crate) fn from_timestamp(value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| DbError::Serialization(format!("timestamp {value} out of range")))
}

/// Parse a stored decimal column.
pub(crate) fn parse_dec(value: &str) -> Result<accrue_types::dec::Dec> {
    value
        .parse()
        .map_err(|e: accrue_types::TypesError| DbError::Serialization(e.to_string()))
}
