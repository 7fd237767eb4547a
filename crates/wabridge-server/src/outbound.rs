//! Outbound message construction and sending.

use std::path::Path;

use tracing::info;

use wabridge_media::{analyze_ogg_opus, infer_media};
use wabridge_proto::{
    AudioContent, DocumentContent, Jid, MediaContent, MediaKind, MessagePayload,
};

use crate::api::AppState;

/// Send a text or media message. Returns `(success, human-readable message)`
/// -- the HTTP layer maps failure onto a 500 without caring why.
pub async fn send_message(
    state: &AppState,
    recipient: &str,
    message: &str,
    media_path: Option<&str>,
) -> (bool, String) {
    if !state.client.is_connected() {
        return (false, "Not connected to WhatsApp".to_string());
    }

    // A bare phone number becomes a user JID; anything with an `@` must
    // already be one.
    let jid = if recipient.contains('@') {
        match Jid::parse(recipient) {
            Ok(jid) => jid,
            Err(e) => return (false, format!("Error parsing JID: {e}")),
        }
    } else {
        Jid::user_jid(recipient)
    };

    let payload = match media_path {
        Some(path) => match build_media_payload(state, Path::new(path), message).await {
            Ok(payload) => payload,
            Err(message) => return (false, message),
        },
        None => MessagePayload::Text {
            body: message.to_string(),
        },
    };

    match state.client.send_message(&jid, payload).await {
        Ok(_) => (true, format!("Message sent to {recipient}")),
        Err(e) => (false, format!("Error sending message: {e}")),
    }
}

/// Read, upload and wrap a local media file as the right typed message.
/// Voice notes additionally need a duration and waveform; an unparseable
/// Ogg file is fatal for the send.
async fn build_media_payload(
    state: &AppState,
    path: &Path,
    caption: &str,
) -> Result<MessagePayload, String> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| format!("Error reading media file: {e}"))?;

    let (kind, mimetype) = infer_media(path);

    let uploaded = state
        .client
        .upload(&data, kind)
        .await
        .map_err(|e| format!("Error uploading media: {e}"))?;

    info!(kind = kind.as_str(), bytes = data.len(), "media uploaded");

    let caption = (!caption.is_empty()).then(|| caption.to_string());
    let media = MediaContent {
        mimetype: mimetype.to_string(),
        caption: None,
        url: uploaded.url,
        direct_path: uploaded.direct_path,
        media_key: uploaded.media_key,
        file_sha256: uploaded.file_sha256,
        file_enc_sha256: uploaded.file_enc_sha256,
        file_length: uploaded.file_length,
    };

    Ok(match kind {
        MediaKind::Image => MessagePayload::Image(MediaContent { caption, ..media }),
        MediaKind::Video => MessagePayload::Video(MediaContent { caption, ..media }),
        MediaKind::Audio => {
            let analysis = analyze_ogg_opus(&data)
                .map_err(|e| format!("Failed to analyze Ogg Opus file: {e}"))?;
            MessagePayload::Audio(AudioContent {
                media,
                seconds: analysis.seconds,
                ptt: true,
                waveform: analysis.waveform,
            })
        }
        MediaKind::Document => MessagePayload::Document(DocumentContent {
            media: MediaContent { caption, ..media },
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{test_state, three_second_ogg};

    #[tokio::test]
    async fn text_send_reaches_the_client() {
        let (_dir, state, mock) = test_state();

        let (success, message) =
            send_message(&state, "27821234567", "hello there", None).await;

        assert!(success, "{message}");
        let sent = mock.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0.to_string(), "27821234567@s.whatsapp.net");
        assert_eq!(
            sent[0].1,
            MessagePayload::Text {
                body: "hello there".into()
            }
        );
    }

    #[tokio::test]
    async fn jid_recipient_is_parsed() {
        let (_dir, state, mock) = test_state();

        let (success, _) = send_message(&state, "123@g.us", "group hello", None).await;

        assert!(success);
        assert_eq!(mock.sent()[0].0.to_string(), "123@g.us");
    }

    #[tokio::test]
    async fn disconnected_client_fails_fast() {
        let (_dir, state, mock) = test_state();
        mock.set_connected(false);

        let (success, message) = send_message(&state, "27821234567", "hi", None).await;

        assert!(!success);
        assert_eq!(message, "Not connected to WhatsApp");
        assert!(mock.sent().is_empty());
    }

    #[tokio::test]
    async fn ogg_send_carries_duration_and_waveform() {
        let (_dir, state, mock) = test_state();

        let dir = tempfile::tempdir().unwrap();
        let ogg_path = dir.path().join("note.ogg");
        std::fs::write(&ogg_path, three_second_ogg()).unwrap();

        let (success, message) =
            send_message(&state, "27821234567", "", Some(ogg_path.to_str().unwrap())).await;
        assert!(success, "{message}");

        let sent = mock.sent();
        let MessagePayload::Audio(audio) = &sent[0].1 else {
            panic!("expected an audio message, got {:?}", sent[0].1);
        };
        assert!((3..=4).contains(&audio.seconds));
        assert!(audio.ptt);
        assert_eq!(audio.waveform.len(), 64);
        assert_eq!(audio.media.mimetype, "audio/ogg; codecs=opus");
        assert!(!audio.media.url.is_empty());
    }

    #[tokio::test]
    async fn broken_ogg_is_fatal_for_the_send() {
        let (_dir, state, mock) = test_state();

        let dir = tempfile::tempdir().unwrap();
        let ogg_path = dir.path().join("note.ogg");
        std::fs::write(&ogg_path, b"definitely not ogg").unwrap();

        let (success, message) =
            send_message(&state, "27821234567", "", Some(ogg_path.to_str().unwrap())).await;

        assert!(!success);
        assert!(message.contains("Failed to analyze Ogg Opus file"), "{message}");
        assert!(mock.sent().is_empty());
    }

    #[tokio::test]
    async fn document_send_keeps_the_basename() {
        let (_dir, state, mock) = test_state();

        let dir = tempfile::tempdir().unwrap();
        let doc_path = dir.path().join("report.pdf");
        std::fs::write(&doc_path, b"%PDF-1.4").unwrap();

        let (success, _) = send_message(
            &state,
            "27821234567",
            "the report",
            Some(doc_path.to_str().unwrap()),
        )
        .await;
        assert!(success);

        let MessagePayload::Document(doc) = &mock.sent()[0].1 else {
            panic!("expected a document message");
        };
        assert_eq!(doc.file_name.as_deref(), Some("report.pdf"));
        assert_eq!(doc.media.caption.as_deref(), Some("the report"));
        assert_eq!(doc.media.mimetype, "application/octet-stream");
    }

    #[tokio::test]
    async fn missing_media_file_fails() {
        let (_dir, state, _mock) = test_state();

        let (success, message) =
            send_message(&state, "27821234567", "", Some("/nonexistent/pic.jpg")).await;

        assert!(!success);
        assert!(message.contains("Error reading media file"), "{message}");
    }
}
