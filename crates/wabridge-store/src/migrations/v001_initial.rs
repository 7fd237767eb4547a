//! v001 -- Initial schema creation.
//!
//! Creates the two core tables: `chats` and `messages`. `IF NOT EXISTS`
//! keeps this safe on databases that predate versioned migrations.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Chats
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS chats (
    jid               TEXT PRIMARY KEY NOT NULL,  -- user@s.whatsapp.net / id@g.us
    name              TEXT,
    last_message_time TEXT NOT NULL               -- ISO-8601 / RFC-3339 UTC
);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id              TEXT NOT NULL,     -- server id, unique only within a chat
    chat_jid        TEXT NOT NULL,     -- FK -> chats(jid)
    sender          TEXT NOT NULL,
    content         TEXT NOT NULL,
    timestamp       TEXT NOT NULL,     -- ISO-8601 / RFC-3339 UTC
    is_from_me      INTEGER NOT NULL,  -- boolean 0/1
    media_type      TEXT,              -- image / video / audio / document
    filename        TEXT,
    url             TEXT,
    media_key       BLOB,              -- opaque decryption key material
    file_sha256     BLOB,
    file_enc_sha256 BLOB,
    file_length     INTEGER,
    transcription   TEXT,

    PRIMARY KEY (id, chat_jid),
    FOREIGN KEY (chat_jid) REFERENCES chats(jid)
);

CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages(timestamp);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
