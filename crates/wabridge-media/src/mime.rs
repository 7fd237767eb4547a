//! File extension to (media kind, MIME type) inference for outbound sends.

use std::path::Path;

use wabridge_proto::MediaKind;

/// Classify a file by extension. Anything unrecognized ships as a document.
pub fn infer_media(path: &Path) -> (MediaKind, &'static str) {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => (MediaKind::Image, "image/jpeg"),
        "png" => (MediaKind::Image, "image/png"),
        "gif" => (MediaKind::Image, "image/gif"),
        "webp" => (MediaKind::Image, "image/webp"),
        "ogg" => (MediaKind::Audio, "audio/ogg; codecs=opus"),
        "mp4" => (MediaKind::Video, "video/mp4"),
        "avi" => (MediaKind::Video, "video/avi"),
        "mov" => (MediaKind::Video, "video/quicktime"),
        _ => (MediaKind::Document, "application/octet-stream"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        let cases: &[(&str, MediaKind, &str)] = &[
            ("photo.JPG", MediaKind::Image, "image/jpeg"),
            ("photo.jpeg", MediaKind::Image, "image/jpeg"),
            ("sticker.webp", MediaKind::Image, "image/webp"),
            ("note.ogg", MediaKind::Audio, "audio/ogg; codecs=opus"),
            ("clip.mp4", MediaKind::Video, "video/mp4"),
            ("clip.mov", MediaKind::Video, "video/quicktime"),
        ];
        for (name, kind, mime) in cases {
            assert_eq!(infer_media(Path::new(name)), (*kind, *mime), "{name}");
        }
    }

    #[test]
    fn unknown_extension_is_a_document() {
        assert_eq!(
            infer_media(Path::new("report.pdf")),
            (MediaKind::Document, "application/octet-stream")
        );
        assert_eq!(
            infer_media(Path::new("no-extension")),
            (MediaKind::Document, "application/octet-stream")
        );
    }
}
