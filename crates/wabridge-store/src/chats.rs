use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::database::{encode_timestamp, Database};
use crate::error::Result;

impl Database {
    /// Insert or replace the chat row. Called for every ingested message, so
    /// re-delivery is harmless.
    pub fn upsert_chat(
        &self,
        jid: &str,
        name: Option<&str>,
        last_message_time: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO chats (jid, name, last_message_time)
                 VALUES (?1, ?2, ?3)",
                params![jid, name, encode_timestamp(last_message_time)],
            )?;
            Ok(())
        })
    }

    /// The stored display name for a chat; `None` when the chat is unknown
    /// or has no usable name yet.
    pub fn chat_name(&self, jid: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let name: Option<Option<String>> = conn
                .query_row("SELECT name FROM chats WHERE jid = ?1", params![jid], |row| {
                    row.get(0)
                })
                .optional()?;

            Ok(name.flatten().filter(|n| !n.is_empty()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("messages.db")).unwrap();
        (dir, db)
    }

    #[test]
    fn upsert_replaces_existing_row() {
        let (_dir, db) = open_db();
        let ts = Utc::now();

        db.upsert_chat("123@s.whatsapp.net", None, ts).unwrap();
        assert_eq!(db.chat_name("123@s.whatsapp.net").unwrap(), None);

        db.upsert_chat("123@s.whatsapp.net", Some("Alice"), ts).unwrap();
        assert_eq!(
            db.chat_name("123@s.whatsapp.net").unwrap(),
            Some("Alice".to_string())
        );
    }

    #[test]
    fn empty_name_reads_as_none() {
        let (_dir, db) = open_db();
        db.upsert_chat("123@s.whatsapp.net", Some(""), Utc::now()).unwrap();
        assert_eq!(db.chat_name("123@s.whatsapp.net").unwrap(), None);
    }

    #[test]
    fn unknown_chat_reads_as_none() {
        let (_dir, db) = open_db();
        assert_eq!(db.chat_name("missing@g.us").unwrap(), None);
    }
}
