//! Shared fixtures for the server test modules.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use wabridge_media::Transcriber;
use wabridge_proto::mock::MockClient;
use wabridge_proto::{
    Event, Jid, LiveMessage, MediaKind, MessageInfo, MessagePayload, ProtocolClient,
};
use wabridge_store::{Database, MediaDescriptor, NewMessage};

use crate::api::AppState;
use crate::auth::AuthHandle;
use crate::config::BridgeConfig;

pub fn test_state() -> (tempfile::TempDir, AppState, Arc<MockClient>) {
    test_state_with_key("")
}

/// A fully wired [`AppState`] over a connected [`MockClient`] and a
/// throwaway store directory. The transcriber points at nonexistent tools so
/// transcription attempts fail fast.
pub fn test_state_with_key(api_key: &str) -> (tempfile::TempDir, AppState, Arc<MockClient>) {
    let dir = tempfile::tempdir().unwrap();

    let config = BridgeConfig {
        api_key: api_key.to_string(),
        store_dir: dir.path().to_path_buf(),
        port: 0,
        pair_phone: None,
        whisper_model_path: dir.path().join("missing-model.bin"),
        whisper_bin_path: dir.path().join("missing-whisper"),
        ffmpeg_bin_path: dir.path().join("missing-ffmpeg"),
    };

    let mock = Arc::new(MockClient::connected());
    let client: Arc<dyn ProtocolClient> = mock.clone();

    let store = Arc::new(Database::open(&config.message_db_path()).unwrap());
    let transcriber = Arc::new(Transcriber::new(
        config.whisper_bin_path.clone(),
        config.whisper_model_path.clone(),
        config.ffmpeg_bin_path.clone(),
    ));

    let state = AppState {
        client,
        store,
        auth: Arc::new(AuthHandle::new()),
        config: Arc::new(config),
        transcriber,
    };

    (dir, state, mock)
}

pub fn text_message(id: &str, chat_jid: &str, timestamp: DateTime<Utc>) -> NewMessage {
    NewMessage {
        id: id.to_string(),
        chat_jid: chat_jid.to_string(),
        sender: "27821234567".to_string(),
        content: format!("message {id}"),
        timestamp,
        is_from_me: false,
        media: None,
    }
}

/// A media-only voice-note row with a complete descriptor.
pub fn audio_message(id: &str, chat_jid: &str) -> NewMessage {
    NewMessage {
        id: id.to_string(),
        chat_jid: chat_jid.to_string(),
        sender: "27821234567".to_string(),
        content: String::new(),
        timestamp: Utc::now(),
        is_from_me: false,
        media: Some(MediaDescriptor {
            kind: MediaKind::Audio,
            filename: format!("audio_{id}.ogg"),
            url: "https://mmg.whatsapp.net/v/t62/123_abc.enc?ccb=11-4".to_string(),
            media_key: vec![1; 32],
            file_sha256: vec![2; 32],
            file_enc_sha256: vec![3; 32],
            file_length: 2048,
        }),
    }
}

pub fn seed_audio_message(state: &AppState, id: &str, chat_jid: &str) {
    let msg = audio_message(id, chat_jid);
    state
        .store
        .upsert_chat(chat_jid, None, msg.timestamp)
        .unwrap();
    state.store.upsert_message(&msg).unwrap();
}

/// A live text message event from a fixture contact.
pub fn text_event(id: &str, body: &str) -> Event {
    Event::Message(LiveMessage {
        info: MessageInfo {
            id: id.to_string(),
            chat: Jid::user_jid("27821234567"),
            sender: Jid::user_jid("27821234567"),
            timestamp: Utc::now(),
            is_from_me: false,
        },
        payload: MessagePayload::Text {
            body: body.to_string(),
        },
    })
}

/// A minimal Ogg Opus container whose final granule position encodes a
/// three-second voice note.
pub fn three_second_ogg() -> Vec<u8> {
    fn page(seq: u32, granule: u64, payload: &[u8]) -> Vec<u8> {
        let mut page = Vec::new();
        page.extend_from_slice(b"OggS");
        page.push(0);
        page.push(0);
        page.extend_from_slice(&granule.to_le_bytes());
        page.extend_from_slice(&0u32.to_le_bytes());
        page.extend_from_slice(&seq.to_le_bytes());
        page.extend_from_slice(&0u32.to_le_bytes());
        page.push(1);
        page.push(payload.len() as u8);
        page.extend_from_slice(payload);
        page
    }

    // Standard 19-byte OpusHead; the analyzer falls back to the 48 kHz
    // granule rate, which is correct for Opus.
    let mut head = Vec::new();
    head.extend_from_slice(b"OpusHead");
    head.push(1);
    head.push(1);
    head.extend_from_slice(&312u16.to_le_bytes());
    head.extend_from_slice(&48_000u32.to_le_bytes());
    head.extend_from_slice(&0u16.to_le_bytes());
    head.push(0);

    let mut data = page(0, 0, &head);
    data.extend_from_slice(&page(1, 0, b"OpusTagstest"));
    data.extend_from_slice(&page(2, 3 * 48_000, &[0u8; 100]));
    data
}
