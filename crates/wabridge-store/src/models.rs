use chrono::{DateTime, Utc};
use serde::Serialize;

use wabridge_proto::MediaKind;

/// Everything needed to re-fetch and decrypt a media attachment later.
/// Stored inline on the message row; the hash and key columns are raw BLOBs
/// because the CDN round-trip must be byte-exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDescriptor {
    pub kind: MediaKind,
    pub filename: String,
    pub url: String,
    pub media_key: Vec<u8>,
    pub file_sha256: Vec<u8>,
    pub file_enc_sha256: Vec<u8>,
    pub file_length: u64,
}

impl MediaDescriptor {
    /// A descriptor can only drive a CDN download when every cryptographic
    /// field made it into the store.
    pub fn is_complete(&self) -> bool {
        !self.url.is_empty()
            && !self.media_key.is_empty()
            && !self.file_sha256.is_empty()
            && !self.file_enc_sha256.is_empty()
            && self.file_length > 0
    }
}

/// A message as handed to [`Database::upsert_message`].
///
/// [`Database::upsert_message`]: crate::Database::upsert_message
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub id: String,
    pub chat_jid: String,
    pub sender: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_from_me: bool,
    pub media: Option<MediaDescriptor>,
}

/// Row shape returned by the recent-messages query and serialized onto the
/// wire by `/api/messages/recent`.
#[derive(Debug, Clone, Serialize)]
pub struct RecentMessage {
    pub id: String,
    pub chat_jid: String,
    pub chat_name: String,
    pub sender: String,
    pub content: String,
    /// ISO-8601 UTC.
    pub timestamp: String,
    pub is_from_me: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
}
