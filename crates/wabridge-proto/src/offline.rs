//! Stand-in client used when no wire-protocol backend is linked in.
//!
//! Every network operation reports the link as down, which is exactly how
//! the bridge behaves between a logout and a re-pair: the HTTP surface, the
//! auth page, and the message store all stay operational. A real backend
//! implements [`ProtocolClient`] out of tree and replaces this at the
//! construction site in `main`.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::client::{
    ContactInfo, EventHandler, GroupInfo, MediaRef, PairClientKind, ProtocolClient, SendAck,
    UploadedMedia,
};
use crate::error::{ProtoError, Result};
use crate::events::QrEvent;
use crate::jid::Jid;
use crate::message::{MediaKind, MessagePayload};

#[derive(Default)]
pub struct OfflineClient {
    handlers: Mutex<Vec<EventHandler>>,
}

impl OfflineClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProtocolClient for OfflineClient {
    fn add_event_handler(&self, handler: EventHandler) {
        self.handlers.lock().unwrap_or_else(|e| e.into_inner()).push(handler);
    }

    async fn connect(&self) -> Result<()> {
        debug!("offline client: connect is a no-op");
        Ok(())
    }

    async fn disconnect(&self) {}

    fn is_connected(&self) -> bool {
        false
    }

    fn device_id(&self) -> Option<Jid> {
        None
    }

    async fn reset_device(&self) -> Result<()> {
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        Ok(())
    }

    async fn qr_channel(&self) -> Result<mpsc::Receiver<QrEvent>> {
        // A pairing attempt with no backend times out immediately.
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.try_send(QrEvent::Timeout);
        Ok(rx)
    }

    async fn pair_phone(
        &self,
        _phone: &str,
        _show_notification: bool,
        _kind: PairClientKind,
        _client_name: &str,
    ) -> Result<String> {
        Err(ProtoError::NotConnected)
    }

    async fn send_message(&self, _to: &Jid, _payload: MessagePayload) -> Result<SendAck> {
        Err(ProtoError::NotConnected)
    }

    async fn upload(&self, _bytes: &[u8], _kind: MediaKind) -> Result<UploadedMedia> {
        Err(ProtoError::NotConnected)
    }

    async fn download(&self, _media: &MediaRef) -> Result<Vec<u8>> {
        Err(ProtoError::NotConnected)
    }

    async fn group_info(&self, _jid: &Jid) -> Result<GroupInfo> {
        Err(ProtoError::NotConnected)
    }

    async fn contact(&self, _jid: &Jid) -> Result<ContactInfo> {
        Err(ProtoError::NotConnected)
    }
}
