//! WhatsApp JIDs.
//!
//! A JID identifies a conversation or a user as `user@server`. Users live on
//! `s.whatsapp.net`, groups on `g.us`. The bridge treats the user part as
//! opaque (usually a phone number for users, a numeric id for groups).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtoError;

/// Server component for individual users.
pub const USER_SERVER: &str = "s.whatsapp.net";

/// Server component for group chats.
pub const GROUP_SERVER: &str = "g.us";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Jid {
    pub user: String,
    pub server: String,
}

impl Jid {
    pub fn new(user: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            server: server.into(),
        }
    }

    /// Build a user JID from a bare phone number.
    pub fn user_jid(phone: impl Into<String>) -> Self {
        Self::new(phone, USER_SERVER)
    }

    /// Parse a `user@server` string.
    pub fn parse(s: &str) -> Result<Self, ProtoError> {
        match s.split_once('@') {
            Some((user, server)) if !user.is_empty() && !server.is_empty() => {
                Ok(Self::new(user, server))
            }
            _ => Err(ProtoError::InvalidJid(s.to_string())),
        }
    }

    pub fn is_group(&self) -> bool {
        self.server == GROUP_SERVER
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.server)
    }
}

impl FromStr for Jid {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
