//! Database connection management.
//!
//! The [`Database`] struct owns a single [`rusqlite::Connection`] behind a
//! mutex and guarantees that migrations are run before any other operation.
//! `rusqlite::Connection` is `Send` but not `Sync`, so every reader and
//! writer is funneled through the one handle; SQLite serializes the writes.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::migrations;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the message database at `path` and bring the schema
    /// up to date. The parent directory is created if missing.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let conn = Connection::open(path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run_migrations(&conn)?;

        tracing::info!(path = %path.display(), "message store opened");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` with the connection. All CRUD helpers go through here so the
    /// single-connection invariant stays in one place.
    pub(crate) fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&conn)
    }
}

/// Fixed-width UTC form (`2026-08-02T09:15:00.000Z`) so lexicographic order
/// on the TEXT column is chronological.
pub(crate) fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
