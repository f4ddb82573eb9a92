//! Chat Room Data Structures
//!
//! Rooms are either backed by a project (one room per project) or created
//! ad hoc by a user. The room list shown to a user is a `RoomSummary`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::SharedError;

/// A chat room and its membership
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    pub id: Uuid,
    pub name: String,
    /// Backing project, if any
    pub project_id: Option<Uuid>,
    pub is_project_room: bool,
    /// Member user IDs, unique
    pub member_ids: Vec<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    /// Bumped on every new message
    pub updated_at: DateTime<Utc>,
}

impl ChatRoom {
    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.member_ids.contains(&user_id)
    }

    /// Ad-hoc rooms with more than two members are groups
    pub fn is_group(&self) -> bool {
        !self.is_project_room && self.member_ids.len() > 2
    }

    /// Members other than `user_id`
    pub fn other_members(&self, user_id: Uuid) -> impl Iterator<Item = Uuid> + '_ {
        self.member_ids.iter().copied().filter(move |id| *id != user_id)
    }
}

/// One entry of a user's room list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: Uuid,
    /// Name shown to the viewing user
    pub display_name: String,
    pub display_avatar: Option<String>,
    pub is_group: bool,
    pub is_project_room: bool,
    pub project_id: Option<Uuid>,
    pub member_ids: Vec<Uuid>,
    pub last_message_text: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_message_sender_id: Option<Uuid>,
    /// Messages by others the viewer has not seen
    pub unread_count: i64,
    pub updated_at: DateTime<Utc>,
}

/// Request to create an ad-hoc room
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub name: String,
    #[serde(default)]
    pub member_ids: Vec<Uuid>,
}

impl CreateRoomRequest {
    /// Trimmed room name, rejecting blank names
    pub fn validated_name(&self) -> Result<String, SharedError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(SharedError::validation("name", "Room name is required"));
        }
        Ok(name.to_string())
    }
}

/// Request to add a member to a room
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: Uuid,
}

/// Deduplicate member IDs preserving first occurrence, always including the creator
pub fn normalize_members(creator_id: Uuid, member_ids: &[Uuid]) -> Vec<Uuid> {
    let mut members = vec![creator_id];
    for id in member_ids {
        if !members.contains(id) {
            members.push(*id);
        }
    }
    members
}
