//! Protocol event ingestion.
//!
//! Translates backend events (live messages, history syncs, connection
//! changes) into store rows. Events may arrive concurrently from the
//! backend's worker tasks; every row carries its own timestamp and the store
//! upserts by primary key, so ordering and re-delivery are both harmless.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use wabridge_proto::{
    Event, HistoryConversation, Jid, LiveMessage, MediaKind, MessagePayload,
};
use wabridge_store::{MediaDescriptor, NewMessage, RecentMessage};

use crate::api::AppState;
use crate::auth::AuthStatus;
use crate::fetch;

/// Register the bridge's event handler on the protocol client. The handler
/// may be invoked from backend worker threads, so the work is shipped onto
/// the runtime.
pub fn install_event_handler(state: &AppState) {
    let runtime = tokio::runtime::Handle::current();
    let handler_state = state.clone();

    state.client.add_event_handler(Arc::new(move |event| {
        let state = handler_state.clone();
        runtime.spawn(async move {
            handle_event(state, event).await;
        });
    }));
}

pub async fn handle_event(state: AppState, event: Event) {
    match event {
        Event::Message(message) => handle_live_message(&state, message).await,
        Event::HistorySync(conversations) => handle_history_sync(&state, conversations).await,
        Event::Connected => {
            info!("connected to WhatsApp");
            state.auth.set_status(AuthStatus::Connected).await;
        }
        Event::LoggedOut => {
            warn!("device logged out");
            state.auth.set_status(AuthStatus::LoggedOut).await;
        }
    }
}

async fn handle_live_message(state: &AppState, message: LiveMessage) {
    let info = &message.info;
    let chat_jid = info.chat.to_string();
    let sender = info.sender.user.clone();

    let name = resolve_chat_name(state, &info.chat, None, &sender).await;
    if let Err(e) = state
        .store
        .upsert_chat(&chat_jid, Some(&name), info.timestamp)
    {
        warn!(error = %e, chat = %chat_jid, "failed to store chat");
    }

    let content = message.payload.text_content().to_string();
    let media = extract_media(&message.payload, info.timestamp);
    if content.is_empty() && media.is_none() {
        return;
    }

    let is_audio = media
        .as_ref()
        .is_some_and(|m| m.kind == MediaKind::Audio);

    let row = NewMessage {
        id: info.id.clone(),
        chat_jid: chat_jid.clone(),
        sender: sender.clone(),
        content,
        timestamp: info.timestamp,
        is_from_me: info.is_from_me,
        media,
    };

    if let Err(e) = state.store.upsert_message(&row) {
        warn!(error = %e, chat = %chat_jid, "failed to store message");
        return;
    }

    info!(
        chat = %chat_jid,
        sender = %sender,
        from_me = info.is_from_me,
        media = row.media.as_ref().map(|m| m.kind.as_str()).unwrap_or(""),
        "message stored"
    );

    // The row is already persisted; transcription is best-effort on the side.
    if is_audio {
        let state = state.clone();
        let id = info.id.clone();
        tokio::spawn(async move {
            auto_transcribe(state, id, chat_jid).await;
        });
    }
}

/// Download, transcribe and attach in the background. Failures are logged
/// and dropped.
async fn auto_transcribe(state: AppState, id: String, chat_jid: String) {
    info!(id = %id, chat = %chat_jid, "auto-transcribing voice note");

    let downloaded = match fetch::download_media(&state, &id, &chat_jid).await {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "failed to download audio for transcription");
            return;
        }
    };

    let text = match state.transcriber.transcribe(&downloaded.path).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "failed to transcribe audio");
            return;
        }
    };

    if text.is_empty() {
        return;
    }

    match state.store.attach_transcription(&id, &chat_jid, &text) {
        Ok(()) => info!(id = %id, transcription = %text, "voice note transcribed"),
        Err(e) => warn!(error = %e, "failed to store transcription"),
    }
}

async fn handle_history_sync(state: &AppState, conversations: Vec<HistoryConversation>) {
    info!(conversations = conversations.len(), "received history sync");

    let mut stored = 0usize;
    for conversation in &conversations {
        let Some(chat_jid) = conversation.id.as_deref() else {
            continue;
        };
        let jid = match Jid::parse(chat_jid) {
            Ok(jid) => jid,
            Err(e) => {
                warn!(error = %e, "failed to parse history sync JID");
                continue;
            }
        };

        let name = resolve_chat_name(state, &jid, Some(conversation), "").await;

        // The newest message seeds the chat's last-message time.
        let Some(latest_ts) = conversation
            .messages
            .first()
            .and_then(|m| m.timestamp)
        else {
            continue;
        };
        if let Err(e) = state.store.upsert_chat(chat_jid, Some(&name), latest_ts) {
            warn!(error = %e, chat = %chat_jid, "failed to store chat");
            continue;
        }

        for message in &conversation.messages {
            let (Some(id), Some(timestamp), Some(payload)) =
                (&message.id, message.timestamp, &message.payload)
            else {
                continue;
            };

            let content = payload.text_content().to_string();
            let media = extract_media(payload, timestamp);
            if content.is_empty() && media.is_none() {
                continue;
            }

            let sender = history_sender(state, &jid, message.from_me, message.participant.as_deref());

            let row = NewMessage {
                id: id.clone(),
                chat_jid: chat_jid.to_string(),
                sender,
                content,
                timestamp,
                is_from_me: message.from_me,
                media,
            };
            match state.store.upsert_message(&row) {
                Ok(()) => stored += 1,
                Err(e) => warn!(error = %e, "failed to store history message"),
            }
        }
    }

    info!(stored, "history sync complete");
}

/// Sender attribution for a history message: group participants keep their
/// own identifier, the owner's messages use the linked device's, and
/// one-on-one chats fall back to the chat itself.
fn history_sender(
    state: &AppState,
    chat: &Jid,
    from_me: bool,
    participant: Option<&str>,
) -> String {
    if from_me {
        return state
            .client
            .device_id()
            .map(|device| device.user)
            .unwrap_or_else(|| chat.user.clone());
    }
    participant
        .filter(|p| !p.is_empty())
        .and_then(|p| Jid::parse(p).ok())
        .map(|jid| jid.user)
        .unwrap_or_else(|| chat.user.clone())
}

/// Build the stored media descriptor for a payload, synthesizing a
/// deterministic filename from the kind and message timestamp when the
/// server did not provide one.
fn extract_media(payload: &MessagePayload, timestamp: DateTime<Utc>) -> Option<MediaDescriptor> {
    let (kind, media, file_name) = payload.media_parts()?;

    let stamp = timestamp.format("%Y%m%d_%H%M%S");
    let filename = match (kind, file_name) {
        (MediaKind::Document, Some(name)) if !name.is_empty() => name.to_string(),
        (MediaKind::Document, _) => format!("document_{stamp}"),
        (MediaKind::Image, _) => format!("image_{stamp}.jpg"),
        (MediaKind::Video, _) => format!("video_{stamp}.mp4"),
        (MediaKind::Audio, _) => format!("audio_{stamp}.ogg"),
    };

    Some(MediaDescriptor {
        kind,
        filename,
        url: media.url.clone(),
        media_key: media.media_key.clone(),
        file_sha256: media.file_sha256.clone(),
        file_enc_sha256: media.file_enc_sha256.clone(),
        file_length: media.file_length,
    })
}

/// Display-name resolution, in precedence order: the name already stored for
/// the chat; server-supplied conversation names (history sync only); group
/// info from the client; contact full / push / business name; the sender;
/// the JID's user part.
async fn resolve_chat_name(
    state: &AppState,
    jid: &Jid,
    conversation: Option<&HistoryConversation>,
    sender: &str,
) -> String {
    if let Ok(Some(existing)) = state.store.chat_name(&jid.to_string()) {
        return existing;
    }

    if jid.is_group() {
        if let Some(conversation) = conversation {
            for candidate in [&conversation.display_name, &conversation.name] {
                if let Some(name) = candidate.as_deref().filter(|n| !n.is_empty()) {
                    return name.to_string();
                }
            }
        }
        return match state.client.group_info(jid).await {
            Ok(group) if !group.name.is_empty() => group.name,
            _ => format!("Group {}", jid.user),
        };
    }

    if let Ok(contact) = state.client.contact(jid).await {
        for candidate in [contact.full_name, contact.push_name, contact.business_name] {
            if let Some(name) = candidate.filter(|n| !n.is_empty()) {
                return name;
            }
        }
    }

    if !sender.is_empty() {
        sender.to_string()
    } else {
        jid.user.clone()
    }
}

/// A stored chat name that is really a bare phone number (all digits,
/// 8-15 characters) is a placeholder worth upgrading.
fn is_phone_number(s: &str) -> bool {
    (8..=15).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
}

/// Upgrade phone-number display names in a recent-messages response.
///
/// Resolved chat names are written back to the store so later queries skip
/// the lookup; sender names are rewritten in the response only. One name
/// cache is shared across all rows of the response.
pub async fn resolve_phone_aliases(state: &AppState, messages: &mut [RecentMessage]) {
    let mut cache: HashMap<String, String> = HashMap::new();

    for message in messages.iter_mut() {
        if is_phone_number(&message.chat_name) {
            if let Some(resolved) = cache.get(&message.chat_name) {
                message.chat_name = resolved.clone();
            } else if let Some(name) = resolve_contact_name(state, &message.chat_jid).await {
                cache.insert(message.chat_name.clone(), name.clone());
                if let Err(e) = state.store.upsert_chat(&message.chat_jid, Some(&name), Utc::now())
                {
                    warn!(error = %e, chat = %message.chat_jid, "failed to persist resolved name");
                }
                message.chat_name = name;
            }
        }

        if !message.is_from_me && is_phone_number(&message.sender) {
            if let Some(resolved) = cache.get(&message.sender) {
                message.sender = resolved.clone();
            } else {
                let sender_jid = format!("{}@{}", message.sender, wabridge_proto::jid::USER_SERVER);
                if let Some(name) = resolve_contact_name(state, &sender_jid).await {
                    cache.insert(message.sender.clone(), name.clone());
                    message.sender = name;
                }
            }
        }
    }
}

async fn resolve_contact_name(state: &AppState, jid_str: &str) -> Option<String> {
    let jid = Jid::parse(jid_str).ok()?;

    if jid.is_group() {
        return state
            .client
            .group_info(&jid)
            .await
            .ok()
            .map(|group| group.name)
            .filter(|name| !name.is_empty());
    }

    let contact = state.client.contact(&jid).await.ok()?;
    [contact.full_name, contact.push_name, contact.business_name]
        .into_iter()
        .flatten()
        .find(|name| !name.is_empty())
}
