//! Events delivered by the protocol backend.
//!
//! The backend invokes every registered handler with an [`Event`] from its
//! own worker tasks; handlers must be cheap and thread-safe. History sync
//! conversations expose their server-supplied names as plain typed fields.

use chrono::{DateTime, Utc};

use crate::jid::Jid;
use crate::message::MessagePayload;

/// Routing metadata for a live message.
#[derive(Debug, Clone)]
pub struct MessageInfo {
    /// Server-assigned id, unique within the chat.
    pub id: String,
    pub chat: Jid,
    pub sender: Jid,
    pub timestamp: DateTime<Utc>,
    pub is_from_me: bool,
}

#[derive(Debug, Clone)]
pub struct LiveMessage {
    pub info: MessageInfo,
    pub payload: MessagePayload,
}

/// One conversation inside a history sync batch.
#[derive(Debug, Clone, Default)]
pub struct HistoryConversation {
    /// Chat JID as a string; conversations without one are skipped.
    pub id: Option<String>,
    /// Server-supplied display name, preferred over everything else.
    pub display_name: Option<String>,
    /// Secondary server-supplied name.
    pub name: Option<String>,
    /// Newest first, matching server delivery order.
    pub messages: Vec<HistoryMessage>,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryMessage {
    pub id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub from_me: bool,
    /// Sender JID string for group messages not sent by the owner.
    pub participant: Option<String>,
    pub payload: Option<MessagePayload>,
}

#[derive(Debug, Clone)]
pub enum Event {
    Message(LiveMessage),
    HistorySync(Vec<HistoryConversation>),
    Connected,
    LoggedOut,
}

/// Items delivered on the QR pairing channel. `Code` repeats as the server
/// rotates the QR; `Success` and `Timeout` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrEvent {
    Code(String),
    Success,
    Timeout,
}
