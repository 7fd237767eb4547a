//! Scriptable protocol client for tests.
//!
//! Fixtures (contacts, group names, upload/download results, QR events) are
//! loaded up front; the mock records every sent payload and counts CDN
//! downloads so tests can assert on exactly what crossed the seam.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;

use crate::client::{
    ContactInfo, EventHandler, GroupInfo, MediaRef, PairClientKind, ProtocolClient, SendAck,
    UploadedMedia,
};
use crate::error::{ProtoError, Result};
use crate::events::{Event, QrEvent};
use crate::jid::Jid;
use crate::message::{MediaKind, MessagePayload};

pub struct MockClient {
    connected: AtomicBool,
    device: Mutex<Option<Jid>>,
    handlers: Mutex<Vec<EventHandler>>,
    contacts: Mutex<HashMap<String, ContactInfo>>,
    groups: Mutex<HashMap<String, GroupInfo>>,
    sent: Mutex<Vec<(Jid, MessagePayload)>>,
    upload_result: Mutex<UploadedMedia>,
    download_data: Mutex<Vec<u8>>,
    download_count: AtomicUsize,
    qr_script: Mutex<Vec<QrEvent>>,
    pair_code: Mutex<String>,
}

impl Default for MockClient {
    fn default() -> Self {
        Self {
            connected: AtomicBool::new(false),
            device: Mutex::new(None),
            handlers: Mutex::new(Vec::new()),
            contacts: Mutex::new(HashMap::new()),
            groups: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            upload_result: Mutex::new(UploadedMedia {
                url: "https://mmg.whatsapp.net/v/t62/123456_abc.enc?ccb=11-4&oh=x".into(),
                direct_path: "/v/t62/123456_abc.enc".into(),
                media_key: vec![0x11; 32],
                file_enc_sha256: vec![0x22; 32],
                file_sha256: vec![0x33; 32],
                file_length: 4096,
            }),
            download_data: Mutex::new(b"decrypted media bytes".to_vec()),
            download_count: AtomicUsize::new(0),
            qr_script: Mutex::new(Vec::new()),
            pair_code: Mutex::new("ABCD-EFGH".into()),
        }
    }
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected() -> Self {
        let mock = Self::default();
        mock.set_connected(true);
        mock.set_device(Some(Jid::user_jid("27820000000")));
        mock
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn set_device(&self, device: Option<Jid>) {
        *self.device.lock().unwrap() = device;
    }

    pub fn add_contact(&self, jid: &str, info: ContactInfo) {
        self.contacts.lock().unwrap().insert(jid.to_string(), info);
    }

    pub fn add_group(&self, jid: &str, name: &str) {
        self.groups
            .lock()
            .unwrap()
            .insert(jid.to_string(), GroupInfo { name: name.into() });
    }

    pub fn set_download_data(&self, data: Vec<u8>) {
        *self.download_data.lock().unwrap() = data;
    }

    pub fn set_upload_result(&self, result: UploadedMedia) {
        *self.upload_result.lock().unwrap() = result;
    }

    pub fn script_qr(&self, events: Vec<QrEvent>) {
        *self.qr_script.lock().unwrap() = events;
    }

    pub fn set_pair_code(&self, code: &str) {
        *self.pair_code.lock().unwrap() = code.to_string();
    }

    /// Payloads passed to `send_message`, oldest first.
    pub fn sent(&self) -> Vec<(Jid, MessagePayload)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn download_count(&self) -> usize {
        self.download_count.load(Ordering::SeqCst)
    }

    /// Deliver an event to every registered handler, the way the backend's
    /// worker tasks would.
    pub fn emit(&self, event: Event) {
        let handlers = self.handlers.lock().unwrap().clone();
        for handler in handlers {
            handler(event.clone());
        }
    }
}

#[async_trait]
impl ProtocolClient for MockClient {
    fn add_event_handler(&self, handler: EventHandler) {
        self.handlers.lock().unwrap().push(handler);
    }

    async fn connect(&self) -> Result<()> {
        self.set_connected(true);
        Ok(())
    }

    async fn disconnect(&self) {
        self.set_connected(false);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn device_id(&self) -> Option<Jid> {
        self.device.lock().unwrap().clone()
    }

    async fn reset_device(&self) -> Result<()> {
        self.set_device(None);
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        self.set_device(None);
        self.set_connected(false);
        Ok(())
    }

    async fn qr_channel(&self) -> Result<mpsc::Receiver<QrEvent>> {
        let events = std::mem::take(&mut *self.qr_script.lock().unwrap());
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            let _ = tx.try_send(event);
        }
        Ok(rx)
    }

    async fn pair_phone(
        &self,
        _phone: &str,
        _show_notification: bool,
        _kind: PairClientKind,
        _client_name: &str,
    ) -> Result<String> {
        Ok(self.pair_code.lock().unwrap().clone())
    }

    async fn send_message(&self, to: &Jid, payload: MessagePayload) -> Result<SendAck> {
        if !self.is_connected() {
            return Err(ProtoError::NotConnected);
        }
        self.sent.lock().unwrap().push((to.clone(), payload));
        Ok(SendAck {
            timestamp: Utc::now(),
        })
    }

    async fn upload(&self, _bytes: &[u8], _kind: MediaKind) -> Result<UploadedMedia> {
        if !self.is_connected() {
            return Err(ProtoError::NotConnected);
        }
        Ok(self.upload_result.lock().unwrap().clone())
    }

    async fn download(&self, _media: &MediaRef) -> Result<Vec<u8>> {
        self.download_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.download_data.lock().unwrap().clone())
    }

    async fn group_info(&self, jid: &Jid) -> Result<GroupInfo> {
        self.groups
            .lock()
            .unwrap()
            .get(&jid.to_string())
            .cloned()
            .ok_or_else(|| ProtoError::Protocol(format!("unknown group {jid}")))
    }

    async fn contact(&self, jid: &Jid) -> Result<ContactInfo> {
        Ok(self
            .contacts
            .lock()
            .unwrap()
            .get(&jid.to_string())
            .cloned()
            .unwrap_or_default())
    }
}
