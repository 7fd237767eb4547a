//! The [`ProtocolClient`] trait: everything the bridge asks of the
//! wire-protocol backend.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::events::{Event, QrEvent};
use crate::jid::Jid;
use crate::message::{MediaKind, MessagePayload};

/// Callback invoked for every protocol event. May be called concurrently
/// from multiple backend worker tasks.
pub type EventHandler = Arc<dyn Fn(Event) + Send + Sync>;

/// Result of uploading a blob to the media CDN.
#[derive(Debug, Clone, Default)]
pub struct UploadedMedia {
    pub url: String,
    pub direct_path: String,
    pub media_key: Vec<u8>,
    pub file_enc_sha256: Vec<u8>,
    pub file_sha256: Vec<u8>,
    pub file_length: u64,
}

/// Everything the backend needs to re-fetch and decrypt a media blob.
#[derive(Debug, Clone)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub url: String,
    pub direct_path: String,
    pub media_key: Vec<u8>,
    pub file_sha256: Vec<u8>,
    pub file_enc_sha256: Vec<u8>,
    pub file_length: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ContactInfo {
    pub full_name: Option<String>,
    pub push_name: Option<String>,
    pub business_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GroupInfo {
    pub name: String,
}

/// Browser identity presented during phone-code pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairClientKind {
    Chrome,
    Firefox,
    Safari,
    Edge,
}

/// Server acknowledgement of a sent message.
#[derive(Debug, Clone)]
pub struct SendAck {
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Register an event handler. Handlers are never removed for the life of
    /// the client.
    fn add_event_handler(&self, handler: EventHandler);

    async fn connect(&self) -> Result<()>;

    async fn disconnect(&self);

    fn is_connected(&self) -> bool;

    /// The stored linked-device identity, if this device has ever paired.
    fn device_id(&self) -> Option<Jid>;

    /// Discard the stored device identity and start from a blank device
    /// store. Only valid while disconnected.
    async fn reset_device(&self) -> Result<()>;

    /// Revoke the pairing with the primary device.
    async fn logout(&self) -> Result<()>;

    /// Channel of QR pairing events. Must be obtained before [`connect`] for
    /// a device with no stored identity.
    ///
    /// [`connect`]: ProtocolClient::connect
    async fn qr_channel(&self) -> Result<mpsc::Receiver<QrEvent>>;

    /// Begin phone-code pairing; returns the code the user types on the
    /// primary device.
    async fn pair_phone(
        &self,
        phone: &str,
        show_notification: bool,
        kind: PairClientKind,
        client_name: &str,
    ) -> Result<String>;

    async fn send_message(&self, to: &Jid, payload: MessagePayload) -> Result<SendAck>;

    /// Encrypt and upload a blob to the media CDN.
    async fn upload(&self, bytes: &[u8], kind: MediaKind) -> Result<UploadedMedia>;

    /// Fetch and decrypt a media blob previously described by `media`.
    async fn download(&self, media: &MediaRef) -> Result<Vec<u8>>;

    async fn group_info(&self, jid: &Jid) -> Result<GroupInfo>;

    async fn contact(&self, jid: &Jid) -> Result<ContactInfo>;

    /// Build the payload that asks the server for a history re-delivery of
    /// up to `count` conversations.
    fn build_history_sync_request(&self, count: u32) -> MessagePayload {
        MessagePayload::HistorySyncRequest { count }
    }
}
