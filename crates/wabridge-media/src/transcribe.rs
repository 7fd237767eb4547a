//! Voice-note transcription via external tools.
//!
//! whisper-cli only accepts WAV input, so the source audio is first
//! converted to 16 kHz mono 16-bit PCM with ffmpeg, into a temporary file
//! that is removed on every exit path. The whisper run has a hard two-minute
//! deadline; a stuck subprocess is killed when the deadline fires.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{MediaError, Result};

const STT_DEADLINE: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct Transcriber {
    whisper_bin: PathBuf,
    whisper_model: PathBuf,
    ffmpeg_bin: PathBuf,
}

impl Transcriber {
    pub fn new(whisper_bin: PathBuf, whisper_model: PathBuf, ffmpeg_bin: PathBuf) -> Self {
        Self {
            whisper_bin,
            whisper_model,
            ffmpeg_bin,
        }
    }

    /// Transcribe the audio file at `audio_path`, returning the trimmed
    /// transcript.
    pub async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        if !self.whisper_bin.exists() {
            return Err(MediaError::MissingTool(self.whisper_bin.clone()));
        }
        if !self.whisper_model.exists() {
            return Err(MediaError::MissingTool(self.whisper_model.clone()));
        }

        // Dropped (and therefore deleted) on every return path below.
        let wav = tempfile::Builder::new()
            .prefix("wabridge-stt-")
            .suffix(".wav")
            .tempfile()?;

        let convert = Command::new(&self.ffmpeg_bin)
            .arg("-i")
            .arg(audio_path)
            .args(["-ar", "16000", "-ac", "1", "-c:a", "pcm_s16le", "-y"])
            .arg(wav.path())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => MediaError::MissingTool(self.ffmpeg_bin.clone()),
                _ => MediaError::Io(e),
            })?;

        if !convert.status.success() {
            return Err(MediaError::Conversion(
                String::from_utf8_lossy(&convert.stderr).trim().to_string(),
            ));
        }

        debug!(wav = %wav.path().display(), "audio converted, running whisper");

        let whisper = timeout(
            STT_DEADLINE,
            Command::new(&self.whisper_bin)
                .arg("-m")
                .arg(&self.whisper_model)
                .arg("-f")
                .arg(wav.path())
                .arg("--no-timestamps")
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| MediaError::Timeout)??;

        if !whisper.status.success() {
            return Err(MediaError::Stt(
                String::from_utf8_lossy(&whisper.stderr).trim().to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&whisper.stdout).trim().to_string())
    }
}
