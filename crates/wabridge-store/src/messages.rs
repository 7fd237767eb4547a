use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use wabridge_proto::MediaKind;

use crate::database::{encode_timestamp, Database};
use crate::error::{Result, StoreError};
use crate::models::{MediaDescriptor, NewMessage, RecentMessage};

impl Database {
    /// Insert or replace a message row.
    ///
    /// Messages with no text and no media attachment are silently skipped --
    /// the protocol delivers plenty of frames (reactions, receipts) the
    /// bridge does not keep. A primary-key conflict replaces the row, which
    /// makes history-sync re-delivery idempotent.
    pub fn upsert_message(&self, msg: &NewMessage) -> Result<()> {
        if msg.content.is_empty() && msg.media.is_none() {
            return Ok(());
        }

        self.with_conn(|conn| {
            let media = msg.media.as_ref();
            conn.execute(
                "INSERT OR REPLACE INTO messages
                 (id, chat_jid, sender, content, timestamp, is_from_me,
                  media_type, filename, url, media_key, file_sha256, file_enc_sha256, file_length)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    msg.id,
                    msg.chat_jid,
                    msg.sender,
                    msg.content,
                    encode_timestamp(msg.timestamp),
                    msg.is_from_me,
                    media.map(|m| m.kind.as_str()),
                    media.map(|m| m.filename.as_str()),
                    media.map(|m| m.url.as_str()),
                    media.map(|m| m.media_key.as_slice()),
                    media.map(|m| m.file_sha256.as_slice()),
                    media.map(|m| m.file_enc_sha256.as_slice()),
                    media.map(|m| m.file_length as i64),
                ],
            )?;
            Ok(())
        })
    }

    /// Attach a transcription to an existing message. A missing row is a
    /// no-op: the message may have been re-keyed by a later history sync.
    pub fn attach_transcription(&self, id: &str, chat_jid: &str, text: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE messages SET transcription = ?1 WHERE id = ?2 AND chat_jid = ?3",
                params![text, id, chat_jid],
            )?;
            Ok(())
        })
    }

    /// The stored transcription, if one exists and is non-empty.
    pub fn get_transcription(&self, id: &str, chat_jid: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let text: Option<Option<String>> = conn
                .query_row(
                    "SELECT transcription FROM messages WHERE id = ?1 AND chat_jid = ?2",
                    params![id, chat_jid],
                    |row| row.get(0),
                )
                .optional()?;

            Ok(text.flatten().filter(|t| !t.is_empty()))
        })
    }

    /// All messages newer than `hours` hours, joined with their chat for the
    /// display name, oldest first. Chats without a usable name fall back to
    /// the chat JID.
    pub fn get_recent_messages(&self, hours: u32) -> Result<Vec<RecentMessage>> {
        let cutoff = encode_timestamp(Utc::now() - Duration::hours(i64::from(hours)));

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.chat_jid, COALESCE(NULLIF(c.name, ''), m.chat_jid) AS chat_name,
                        m.sender, m.content, m.timestamp, m.is_from_me,
                        m.media_type, m.transcription
                 FROM messages m
                 LEFT JOIN chats c ON c.jid = m.chat_jid
                 WHERE m.timestamp >= ?1
                 ORDER BY m.timestamp ASC",
            )?;

            let rows = stmt
                .query_map(params![cutoff], |row| {
                    Ok(RecentMessage {
                        id: row.get(0)?,
                        chat_jid: row.get(1)?,
                        chat_name: row.get(2)?,
                        sender: row.get(3)?,
                        content: row.get(4)?,
                        timestamp: row.get(5)?,
                        is_from_me: row.get(6)?,
                        media_kind: row.get::<_, Option<String>>(7)?.filter(|m| !m.is_empty()),
                        transcription: row.get::<_, Option<String>>(8)?.filter(|t| !t.is_empty()),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// The media descriptor for a message.
    ///
    /// Errors with [`StoreError::NotFound`] when the message does not exist
    /// and [`StoreError::NoMedia`] when it carries no attachment.
    pub fn get_media_descriptor(&self, id: &str, chat_jid: &str) -> Result<MediaDescriptor> {
        self.with_conn(|conn| query_media_descriptor(conn, id, chat_jid))
    }
}

fn query_media_descriptor(conn: &Connection, id: &str, chat_jid: &str) -> Result<MediaDescriptor> {
    let row = conn
        .query_row(
            "SELECT media_type, filename, url, media_key, file_sha256, file_enc_sha256, file_length
             FROM messages WHERE id = ?1 AND chat_jid = ?2",
            params![id, chat_jid],
            |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<Vec<u8>>>(3)?,
                    row.get::<_, Option<Vec<u8>>>(4)?,
                    row.get::<_, Option<Vec<u8>>>(5)?,
                    row.get::<_, Option<i64>>(6)?,
                ))
            },
        )
        .optional()?;

    let Some((media_type, filename, url, media_key, file_sha256, file_enc_sha256, file_length)) =
        row
    else {
        return Err(StoreError::NotFound);
    };

    let kind = media_type
        .as_deref()
        .and_then(MediaKind::parse)
        .ok_or(StoreError::NoMedia)?;

    Ok(MediaDescriptor {
        kind,
        filename: filename.unwrap_or_default(),
        url: url.unwrap_or_default(),
        media_key: media_key.unwrap_or_default(),
        file_sha256: file_sha256.unwrap_or_default(),
        file_enc_sha256: file_enc_sha256.unwrap_or_default(),
        file_length: file_length.unwrap_or_default().max(0) as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn open_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("messages.db")).unwrap();
        (dir, db)
    }

    fn text_message(id: &str, chat: &str, ts: DateTime<Utc>) -> NewMessage {
        NewMessage {
            id: id.into(),
            chat_jid: chat.into(),
            sender: "27821234567".into(),
            content: format!("message {id}"),
            timestamp: ts,
            is_from_me: false,
            media: None,
        }
    }

    fn audio_descriptor() -> MediaDescriptor {
        MediaDescriptor {
            kind: MediaKind::Audio,
            filename: "audio_20260802_091500.ogg".into(),
            url: "https://mmg.whatsapp.net/v/t62/123_abc.enc?ccb=11-4".into(),
            media_key: vec![1; 32],
            file_sha256: vec![2; 32],
            file_enc_sha256: vec![3; 32],
            file_length: 2048,
        }
    }

    #[test]
    fn upsert_skips_empty_messages() {
        let (_dir, db) = open_db();
        db.upsert_chat("c@g.us", None, Utc::now()).unwrap();

        let mut msg = text_message("A", "c@g.us", Utc::now());
        msg.content = String::new();
        db.upsert_message(&msg).unwrap();

        assert!(db.get_recent_messages(1).unwrap().is_empty());
    }

    #[test]
    fn upsert_requires_chat_row() {
        let (_dir, db) = open_db();
        let err = db
            .upsert_message(&text_message("A", "nochat@g.us", Utc::now()))
            .unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }

    #[test]
    fn reingesting_is_idempotent() {
        let (_dir, db) = open_db();
        let ts = Utc::now();
        db.upsert_chat("c@g.us", Some("Chat"), ts).unwrap();

        let mut msg = text_message("A", "c@g.us", ts);
        db.upsert_message(&msg).unwrap();
        db.upsert_message(&msg).unwrap();

        msg.content = "edited on redelivery".into();
        db.upsert_message(&msg).unwrap();

        let rows = db.get_recent_messages(1).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].content, "edited on redelivery");
    }

    #[test]
    fn recent_messages_filter_and_order() {
        let (_dir, db) = open_db();
        let now = Utc::now();
        db.upsert_chat("c@g.us", None, now).unwrap();

        db.upsert_message(&text_message("old", "c@g.us", now - Duration::hours(72)))
            .unwrap();
        db.upsert_message(&text_message("mid", "c@g.us", now - Duration::hours(24)))
            .unwrap();
        db.upsert_message(&text_message("new", "c@g.us", now - Duration::hours(1)))
            .unwrap();

        let rows = db.get_recent_messages(48).unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["mid", "new"]);
        // Nameless chat falls back to the JID.
        assert_eq!(rows[0].chat_name, "c@g.us");
    }

    #[test]
    fn recent_messages_surface_media_kind_and_transcription() {
        let (_dir, db) = open_db();
        let now = Utc::now();
        db.upsert_chat("c@g.us", Some("Chat"), now).unwrap();

        let mut msg = text_message("A", "c@g.us", now);
        msg.content = String::new();
        msg.media = Some(audio_descriptor());
        db.upsert_message(&msg).unwrap();
        db.attach_transcription("A", "c@g.us", "hello world").unwrap();

        let rows = db.get_recent_messages(1).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].media_kind.as_deref(), Some("audio"));
        assert_eq!(rows[0].transcription.as_deref(), Some("hello world"));
        assert_eq!(rows[0].chat_name, "Chat");
    }

    #[test]
    fn attach_transcription_on_missing_row_is_noop() {
        let (_dir, db) = open_db();
        db.attach_transcription("nope", "c@g.us", "text").unwrap();
        assert_eq!(db.get_transcription("nope", "c@g.us").unwrap(), None);
    }

    #[test]
    fn media_descriptor_round_trip() {
        let (_dir, db) = open_db();
        let now = Utc::now();
        db.upsert_chat("c@g.us", None, now).unwrap();

        let mut msg = text_message("A", "c@g.us", now);
        msg.media = Some(audio_descriptor());
        db.upsert_message(&msg).unwrap();

        let descriptor = db.get_media_descriptor("A", "c@g.us").unwrap();
        assert_eq!(descriptor, audio_descriptor());
        assert!(descriptor.is_complete());
    }

    #[test]
    fn media_descriptor_errors() {
        let (_dir, db) = open_db();
        let now = Utc::now();
        db.upsert_chat("c@g.us", None, now).unwrap();
        db.upsert_message(&text_message("text-only", "c@g.us", now))
            .unwrap();

        assert!(matches!(
            db.get_media_descriptor("missing", "c@g.us"),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            db.get_media_descriptor("text-only", "c@g.us"),
            Err(StoreError::NoMedia)
        ));
    }

    #[test]
    fn incomplete_descriptor_is_detected() {
        let mut descriptor = audio_descriptor();
        descriptor.media_key.clear();
        assert!(!descriptor.is_complete());

        let mut descriptor = audio_descriptor();
        descriptor.file_length = 0;
        assert!(!descriptor.is_complete());
    }
}
