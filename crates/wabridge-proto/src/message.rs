//! Typed message payloads.
//!
//! The wire protocol's message proto is a bag of optional sub-messages; the
//! backend decodes the ones the bridge cares about into [`MessagePayload`]
//! variants and collapses everything else into [`MessagePayload::Unsupported`]
//! (reactions, receipts, protocol frames). Outbound messages are built from
//! the same variants.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Document => "document",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            "audio" => Some(MediaKind::Audio),
            "document" => Some(MediaKind::Document),
            _ => None,
        }
    }
}

/// The descriptor fields every media sub-message carries: where the encrypted
/// blob lives on the CDN and the key material needed to decrypt it.
///
/// `media_key` and the two SHA-256 digests are opaque bytes; they round-trip
/// to storage as raw BLOBs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaContent {
    pub mimetype: String,
    pub caption: Option<String>,
    pub url: String,
    pub direct_path: String,
    pub media_key: Vec<u8>,
    pub file_sha256: Vec<u8>,
    pub file_enc_sha256: Vec<u8>,
    pub file_length: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioContent {
    pub media: MediaContent,
    /// Playback duration in whole seconds.
    pub seconds: u32,
    /// Push-to-talk flag; true renders as a voice note.
    pub ptt: bool,
    /// 64-byte amplitude envelope shown in the voice-note bubble.
    pub waveform: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentContent {
    pub media: MediaContent,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagePayload {
    Text { body: String },
    Image(MediaContent),
    Video(MediaContent),
    Audio(AudioContent),
    Document(DocumentContent),
    /// Asks the server to re-deliver up to `count` prior conversations.
    HistorySyncRequest { count: u32 },
    /// Anything the bridge does not ingest.
    Unsupported,
}

impl MessagePayload {
    /// The text body of the message. Captions on media messages are not
    /// message text.
    pub fn text_content(&self) -> &str {
        match self {
            MessagePayload::Text { body } => body,
            _ => "",
        }
    }

    /// The media attachment, if any: kind, shared descriptor fields, and the
    /// server-supplied file name (documents only).
    pub fn media_parts(&self) -> Option<(MediaKind, &MediaContent, Option<&str>)> {
        match self {
            MessagePayload::Image(m) => Some((MediaKind::Image, m, None)),
            MessagePayload::Video(m) => Some((MediaKind::Video, m, None)),
            MessagePayload::Audio(a) => Some((MediaKind::Audio, &a.media, None)),
            MessagePayload::Document(d) => {
                Some((MediaKind::Document, &d.media, d.file_name.as_deref()))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_content_ignores_captions() {
        let text = MessagePayload::Text {
            body: "hello".into(),
        };
        assert_eq!(text.text_content(), "hello");

        let image = MessagePayload::Image(MediaContent {
            caption: Some("a caption".into()),
            ..Default::default()
        });
        assert_eq!(image.text_content(), "");
        assert!(image.media_parts().is_some());
    }

    #[test]
    fn media_kind_round_trips_through_text() {
        for kind in [
            MediaKind::Image,
            MediaKind::Video,
            MediaKind::Audio,
            MediaKind::Document,
        ] {
            assert_eq!(MediaKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(MediaKind::parse("sticker"), None);
    }

    #[test]
    fn document_exposes_file_name() {
        let doc = MessagePayload::Document(DocumentContent {
            media: MediaContent::default(),
            file_name: Some("report.pdf".into()),
        });
        let (kind, _, name) = doc.media_parts().unwrap();
        assert_eq!(kind, MediaKind::Document);
        assert_eq!(name, Some("report.pdf"));
    }
}
