//! Contract with the WhatsApp wire-protocol library.
//!
//! The bridge never speaks the wire protocol itself (Noise handshake, Signal
//! ratchet, binary node encoding); it drives a backend through the
//! [`ProtocolClient`] trait defined here. This crate also carries the data
//! types that cross that seam: JIDs, typed message payloads, protocol events,
//! and the QR pairing channel.

pub mod client;
pub mod events;
pub mod jid;
pub mod message;
pub mod offline;

#[cfg(feature = "mock")]
pub mod mock;

mod error;

pub use client::{
    ContactInfo, EventHandler, GroupInfo, MediaRef, PairClientKind, ProtocolClient, SendAck,
    UploadedMedia,
};
pub use error::{ProtoError, Result};
pub use events::{Event, HistoryConversation, HistoryMessage, LiveMessage, MessageInfo, QrEvent};
pub use jid::Jid;
pub use message::{AudioContent, DocumentContent, MediaContent, MediaKind, MessagePayload};
pub use offline::OfflineClient;
