use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtoError {
    #[error("not connected to WhatsApp")]
    NotConnected,

    #[error("no linked device")]
    NoDevice,

    #[error("invalid JID: {0}")]
    InvalidJid(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, ProtoError>;
