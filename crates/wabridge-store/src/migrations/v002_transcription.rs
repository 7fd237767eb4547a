//! v002 -- Adopt the `transcription` column.
//!
//! Databases created by v001 already have the column; databases from older
//! bridge builds do not. SQLite has no `ADD COLUMN IF NOT EXISTS`, so the ALTER is
//! attempted and a "duplicate column" failure counts as success. Any other
//! failure aborts startup.

use rusqlite::Connection;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    match conn.execute("ALTER TABLE messages ADD COLUMN transcription TEXT", []) {
        Ok(_) => Ok(()),
        Err(err) if err.to_string().contains("duplicate column") => Ok(()),
        Err(err) => Err(err),
    }
}
