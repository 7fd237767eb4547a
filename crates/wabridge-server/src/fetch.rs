//! On-demand media retrieval.
//!
//! The stored descriptor carries everything the backend needs to re-fetch
//! and decrypt a blob from the CDN. Decrypted files land under
//! `<store_dir>/<chat>/<filename>` with a deterministic name, so a file
//! already on disk is a cache hit and no network fetch happens.

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use wabridge_proto::{MediaKind, MediaRef, ProtoError};
use wabridge_store::StoreError;

use crate::api::AppState;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to find message: {0}")]
    Store(#[from] StoreError),

    #[error("incomplete media information for download")]
    Incomplete,

    #[error("failed to download media: {0}")]
    Protocol(#[from] ProtoError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct DownloadedMedia {
    pub kind: MediaKind,
    pub filename: String,
    /// Absolute path of the decrypted file.
    pub path: PathBuf,
}

/// Chat JIDs contain `:` on some devices; keep directory names portable.
fn chat_dir_name(chat_jid: &str) -> String {
    chat_jid.replace(':', "_")
}

/// The CDN-relative path portion of a media URL: everything after `.net/` up
/// to the query string, with a leading slash.
fn direct_path_from_url(url: &str) -> String {
    match url.split_once(".net/") {
        Some((_, rest)) => {
            let path = rest.split('?').next().unwrap_or(rest);
            format!("/{path}")
        }
        None => url.to_string(),
    }
}

/// Fetch the media attachment of a message to local disk, decrypting it via
/// the protocol client. Returns the cached file when it already exists.
pub async fn download_media(
    state: &AppState,
    message_id: &str,
    chat_jid: &str,
) -> Result<DownloadedMedia, FetchError> {
    let descriptor = state.store.get_media_descriptor(message_id, chat_jid)?;
    if !descriptor.is_complete() {
        return Err(FetchError::Incomplete);
    }

    let chat_dir = state.config.store_dir.join(chat_dir_name(chat_jid));
    let local_path = chat_dir.join(&descriptor.filename);
    let abs_path = std::path::absolute(&local_path)?;

    if tokio::fs::try_exists(&local_path).await? {
        return Ok(DownloadedMedia {
            kind: descriptor.kind,
            filename: descriptor.filename,
            path: abs_path,
        });
    }

    let media = MediaRef {
        kind: descriptor.kind,
        direct_path: direct_path_from_url(&descriptor.url),
        url: descriptor.url.clone(),
        media_key: descriptor.media_key.clone(),
        file_sha256: descriptor.file_sha256.clone(),
        file_enc_sha256: descriptor.file_enc_sha256.clone(),
        file_length: descriptor.file_length,
    };

    let bytes = state.client.download(&media).await?;

    tokio::fs::create_dir_all(&chat_dir).await?;

    // Write under a temporary name first: an interrupted write must not leave
    // a half-file at the cache path.
    let part_path = chat_dir.join(format!("{}.part", descriptor.filename));
    tokio::fs::write(&part_path, &bytes).await?;
    tokio::fs::rename(&part_path, &local_path).await?;

    info!(
        kind = descriptor.kind.as_str(),
        bytes = bytes.len(),
        path = %abs_path.display(),
        "media downloaded"
    );

    Ok(DownloadedMedia {
        kind: descriptor.kind,
        filename: descriptor.filename,
        path: abs_path,
    })
}
