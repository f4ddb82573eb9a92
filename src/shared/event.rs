/**
 * Real-time Event Frames
 *
 * JSON frames exchanged over the persistent connection. Every frame carries a
 * `type` discriminator.
 *
 * Client → server: `auth`, `join_room`, `leave_room`, `typing`.
 * Server → client: `authenticated`, `rejected`, `joined`, `left`,
 * `message_new`, `typing`, `presence_update`, `error`.
 */
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::SharedError;
use crate::shared::messaging::MessageView;

/// Frame sent by a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Identity token, only valid as the first frame
    Auth { token: String },
    JoinRoom { room_id: Uuid },
    LeaveRoom { room_id: Uuid },
    Typing { room_id: Uuid, is_typing: bool },
}

impl ClientEvent {
    /// Parse a text frame
    pub fn parse(text: &str) -> Result<Self, SharedError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Frame sent by the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Authenticated { user_id: Uuid },
    /// Terminal: the connection is closed after this frame
    Rejected { reason: String },
    Joined { room_id: Uuid },
    Left { room_id: Uuid },
    MessageNew { room_id: Uuid, message: MessageView },
    Typing {
        room_id: Uuid,
        user_id: Uuid,
        username: String,
        is_typing: bool,
    },
    PresenceUpdate { user_id: Uuid, online: bool },
    /// Non-fatal problem with a client frame
    Error { message: String },
}

impl ServerEvent {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Serialize to a text frame
    pub fn to_json(&self) -> Result<String, SharedError> {
        Ok(serde_json::to_string(self)?)
    }
}
