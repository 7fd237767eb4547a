use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Shared secret for mutating endpoints. Empty disables the check
    /// (local development).
    pub api_key: String,
    /// Root directory for both databases and downloaded media.
    pub store_dir: PathBuf,
    pub port: u16,
    /// When set at first launch, pair with a phone code instead of a QR.
    pub pair_phone: Option<String>,
    pub whisper_model_path: PathBuf,
    pub whisper_bin_path: PathBuf,
    pub ffmpeg_bin_path: PathBuf,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            store_dir: PathBuf::from("store"),
            port: 8080,
            pair_phone: None,
            whisper_model_path: PathBuf::from("models/ggml-base.en.bin"),
            whisper_bin_path: PathBuf::from("/opt/homebrew/bin/whisper-cli"),
            ffmpeg_bin_path: PathBuf::from("/opt/homebrew/bin/ffmpeg"),
        }
    }
}

impl BridgeConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(key) = std::env::var("BRIDGE_API_KEY") {
            config.api_key = key;
        }

        if let Ok(dir) = std::env::var("STORE_DIR") {
            if !dir.is_empty() {
                config.store_dir = PathBuf::from(dir);
            }
        }

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(parsed) = port.parse::<u16>() {
                config.port = parsed;
            } else {
                tracing::warn!(value = %port, "Invalid PORT, using default");
            }
        }

        if let Ok(phone) = std::env::var("PAIR_PHONE") {
            if !phone.is_empty() {
                config.pair_phone = Some(phone);
            }
        }

        if let Ok(path) = std::env::var("WHISPER_MODEL_PATH") {
            config.whisper_model_path = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("WHISPER_BIN_PATH") {
            config.whisper_bin_path = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("FFMPEG_BIN_PATH") {
            config.ffmpeg_bin_path = PathBuf::from(path);
        }

        config
    }

    /// Path of the application message database.
    pub fn message_db_path(&self) -> PathBuf {
        self.store_dir.join("messages.db")
    }
}
