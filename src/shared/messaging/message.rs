//! Chat Message Data Structure
//!
//! Represents a message in a chat room, the request used to create one, and
//! the preview labels shared by the room list and push notifications.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::SharedError;

/// Type of message content
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Plain text message
    #[default]
    Text,
    /// Image attachment
    Image,
    /// Video attachment
    Video,
    /// Voice message
    Audio,
    /// Generic file attachment
    File,
}

impl MessageKind {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::Video => "video",
            MessageKind::Audio => "audio",
            MessageKind::File => "file",
        }
    }

    /// Human label used when a message has no text to preview
    pub fn label(&self) -> &'static str {
        match self {
            MessageKind::Text => "",
            MessageKind::Image => "Photo",
            MessageKind::Video => "Video",
            MessageKind::Audio => "Voice message",
            MessageKind::File => "File",
        }
    }

    /// Whether this kind carries media rather than text
    pub fn is_media(&self) -> bool {
        !matches!(self, MessageKind::Text)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageKind::Text),
            "image" => Ok(MessageKind::Image),
            "video" => Ok(MessageKind::Video),
            "audio" => Ok(MessageKind::Audio),
            "file" => Ok(MessageKind::File),
            other => Err(SharedError::validation(
                "type",
                format!("unknown message type '{}'", other),
            )),
        }
    }
}

/// Preview text for a message: the trimmed text when there is any,
/// otherwise the label of its kind.
///
/// Used both for the room list (`lastMessageText`) and for push bodies.
pub fn message_preview(kind: MessageKind, text: Option<&str>) -> String {
    match text.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => kind.label().to_string(),
    }
}

/// Represents a persisted chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Unique message ID
    pub id: Uuid,
    /// Room this message belongs to
    pub room_id: Uuid,
    /// User who sent the message
    pub sender_id: Uuid,
    /// Type of message
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Text content (required for text messages, optional caption otherwise)
    pub text: Option<String>,
    /// Media location for non-text messages
    pub media_url: Option<String>,
    /// Users who have read this message
    pub seen_by: Vec<Uuid>,
    /// Creation time, strictly increasing within a room
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Preview of this message for room lists and notifications
    pub fn preview(&self) -> String {
        message_preview(self.kind, self.text.as_deref())
    }

    /// Whether `user_id` has read this message
    pub fn is_seen_by(&self, user_id: Uuid) -> bool {
        self.seen_by.contains(&user_id)
    }
}

/// Display fields of a message sender
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SenderProfile {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: String,
}

impl SenderProfile {
    /// Placeholder used when the user directory has no record
    pub fn unknown(id: Uuid) -> Self {
        Self {
            id,
            username: "Someone".to_string(),
            avatar_url: String::new(),
        }
    }
}

/// A message enriched with its sender's display fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    #[serde(flatten)]
    pub message: ChatMessage,
    pub sender: SenderProfile,
}

/// Request to send a message
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    /// Push identifier of the sending device, never notified
    #[serde(default)]
    pub sender_device: Option<String>,
}

/// Message content that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    kind: MessageKind,
    text: Option<String>,
    media_url: Option<String>,
}

impl NewMessage {
    /// Validate raw message content.
    ///
    /// Text messages need non-blank text and never keep a media URL.
    /// Media messages need a non-blank `media_url`; their text is an
    /// optional caption.
    pub fn new(
        kind: MessageKind,
        text: Option<String>,
        media_url: Option<String>,
    ) -> Result<Self, SharedError> {
        let text = text.filter(|t| !t.trim().is_empty());
        let media_url = media_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        if kind.is_media() {
            if media_url.is_none() {
                return Err(SharedError::validation(
                    "mediaUrl",
                    "Media message requires mediaUrl",
                ));
            }
            Ok(Self { kind, text, media_url })
        } else {
            if text.is_none() {
                return Err(SharedError::validation(
                    "text",
                    "Text message requires non-empty text",
                ));
            }
            Ok(Self { kind, text, media_url: None })
        }
    }

    /// Shorthand for a validated text message
    pub fn text(text: impl Into<String>) -> Result<Self, SharedError> {
        Self::new(MessageKind::Text, Some(text.into()), None)
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn text_content(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn media_url(&self) -> Option<&str> {
        self.media_url.as_deref()
    }
}

impl TryFrom<&SendMessageRequest> for NewMessage {
    type Error = SharedError;

    fn try_from(request: &SendMessageRequest) -> Result<Self, Self::Error> {
        NewMessage::new(request.kind, request.text.clone(), request.media_url.clone())
    }
}

/// Query parameters for listing messages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListMessagesQuery {
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_requires_non_blank_text() {
        assert!(NewMessage::text("hi").is_ok());
        let err = NewMessage::new(MessageKind::Text, Some("   ".into()), None).unwrap_err();
        assert!(matches!(err, SharedError::ValidationError { ref field, .. } if field == "text"));
        assert!(NewMessage::new(MessageKind::Text, None, Some("x".into())).is_err());
    }

    #[test]
    fn test_image_requires_media_url() {
        let err = NewMessage::new(MessageKind::Image, None, Some(String::new())).unwrap_err();
        assert!(matches!(err, SharedError::ValidationError { ref field, .. } if field == "mediaUrl"));

        let ok = NewMessage::new(MessageKind::Image, None, Some("x".into())).unwrap();
        assert_eq!(ok.media_url(), Some("x"));
        assert_eq!(ok.kind(), MessageKind::Image);
    }

    #[test]
    fn test_text_message_drops_media_url() {
        let msg = NewMessage::new(MessageKind::Text, Some("hello".into()), Some("x".into())).unwrap();
        assert_eq!(msg.media_url(), None);
        assert_eq!(msg.text_content(), Some("hello"));
    }

    #[test]
    fn test_preview_labels() {
        assert_eq!(message_preview(MessageKind::Text, Some("  hi  ")), "hi");
        assert_eq!(message_preview(MessageKind::Image, None), "Photo");
        assert_eq!(message_preview(MessageKind::Image, Some(" ")), "Photo");
        assert_eq!(message_preview(MessageKind::Video, None), "Video");
        assert_eq!(message_preview(MessageKind::Audio, None), "Voice message");
        assert_eq!(message_preview(MessageKind::File, None), "File");
        assert_eq!(message_preview(MessageKind::Image, Some("look")), "look");
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("audio".parse::<MessageKind>().unwrap(), MessageKind::Audio);
        assert!("sticker".parse::<MessageKind>().is_err());
    }

    #[test]
    fn test_send_request_defaults_to_text() {
        let request: SendMessageRequest = serde_json::from_str(r#"{"text":"hi"}"#).unwrap();
        assert_eq!(request.kind, MessageKind::Text);

        let request: SendMessageRequest =
            serde_json::from_str(r#"{"type":"image","mediaUrl":"x","senderDevice":"d1"}"#).unwrap();
        assert_eq!(request.kind, MessageKind::Image);
        assert_eq!(request.sender_device.as_deref(), Some("d1"));
    }

    #[test]
    fn test_unknown_type_rejected_on_deserialize() {
        let result: Result<SendMessageRequest, _> = serde_json::from_str(r#"{"type":"sticker"}"#);
        assert!(result.is_err());
    }
}
