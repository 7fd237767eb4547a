use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("not a valid Ogg file (missing OggS signature)")]
    NotOgg,

    #[error("required tool or model missing: {}", .0.display())]
    MissingTool(PathBuf),

    #[error("audio conversion failed: {0}")]
    Conversion(String),

    #[error("transcription failed: {0}")]
    Stt(String),

    #[error("transcription timed out")]
    Timeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MediaError>;
