//! Messaging Module
//!
//! Data structures for rooms and messages:
//!
//! - `ChatRoom` / `RoomSummary` - rooms and the per-user room list entry
//! - `ChatMessage` / `MessageView` - persisted messages, optionally with sender fields
//! - `NewMessage` - validated message content
//!
//! # Usage
//!
//! ```rust
//! use sentinel_chat::shared::messaging::{MessageKind, NewMessage};
//!
//! let message = NewMessage::new(MessageKind::Image, None, Some("x".into()));
//! assert!(message.is_ok());
//! ```

pub mod message;
pub mod room;

pub use message::{
    message_preview, ChatMessage, ListMessagesQuery, MessageKind, MessageView, NewMessage,
    SendMessageRequest, SenderProfile,
};
pub use room::{normalize_members, AddMemberRequest, ChatRoom, CreateRoomRequest, RoomSummary};
