/**
 * Room List Aggregation
 *
 * Builds the room list a user sees: each room with its last message
 * preview, unread count and a display name/avatar that depends on the kind
 * of room:
 *
 * - project room: the project's name
 * - two members: the other member's name and avatar
 * - otherwise: the room's own name
 *
 * Rooms come back most recently active first.
 */

use std::collections::HashMap;

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::backend::chat::db;
use crate::backend::directory::{ProjectDirectory, UserDirectory, UserRecord};
use crate::backend::error::BackendResult;
use crate::shared::messaging::{ChatMessage, ChatRoom, RoomSummary};

/// Assemble one summary from already-loaded parts
pub fn build_summary(
    room: &ChatRoom,
    last_message: Option<&ChatMessage>,
    unread_count: i64,
    project_name: Option<&str>,
    other_member: Option<&UserRecord>,
) -> RoomSummary {
    let (display_name, display_avatar) = if room.is_project_room {
        (project_name.unwrap_or(&room.name).to_string(), None)
    } else if room.member_ids.len() == 2 {
        match other_member {
            Some(other) => (other.username.clone(), Some(other.avatar_url.clone())),
            None => (room.name.clone(), None),
        }
    } else {
        (room.name.clone(), None)
    };

    RoomSummary {
        id: room.id,
        display_name,
        display_avatar,
        is_group: room.is_group(),
        is_project_room: room.is_project_room,
        project_id: room.project_id,
        member_ids: room.member_ids.clone(),
        last_message_text: last_message.map(ChatMessage::preview),
        last_message_at: last_message.map(|m| m.created_at),
        last_message_sender_id: last_message.map(|m| m.sender_id),
        unread_count,
        updated_at: room.updated_at,
    }
}

/// Room list for `user_id`, ordered by `updated_at` descending
pub async fn list_rooms_for_user(
    pool: &SqlitePool,
    users: &dyn UserDirectory,
    projects: &dyn ProjectDirectory,
    user_id: Uuid,
) -> BackendResult<Vec<RoomSummary>> {
    let rooms = db::rooms_for_user(pool, user_id).await?;

    let direct_peers: Vec<Uuid> = rooms
        .iter()
        .filter(|room| !room.is_project_room && room.member_ids.len() == 2)
        .filter_map(|room| room.other_members(user_id).next())
        .collect();
    let peers: HashMap<Uuid, UserRecord> = users
        .find_by_ids(&direct_peers)
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect();

    let mut summaries = Vec::with_capacity(rooms.len());
    for room in &rooms {
        let last = db::last_message(pool, room.id).await?;
        let unread = db::unread_count(pool, room.id, user_id).await?;

        let project_name = match (room.is_project_room, room.project_id) {
            (true, Some(project_id)) => projects.find_project(project_id).await?.map(|p| p.name),
            _ => None,
        };
        let other = room
            .other_members(user_id)
            .next()
            .and_then(|id| peers.get(&id));

        summaries.push(build_summary(
            room,
            last.as_ref(),
            unread,
            project_name.as_deref(),
            other,
        ));
    }

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::messaging::MessageKind;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn room(members: Vec<Uuid>, is_project_room: bool) -> ChatRoom {
        let now = Utc::now();
        ChatRoom {
            id: Uuid::new_v4(),
            name: "Room".into(),
            project_id: is_project_room.then(Uuid::new_v4),
            is_project_room,
            member_ids: members,
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    fn message(kind: MessageKind, text: Option<&str>) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            room_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            kind,
            text: text.map(str::to_string),
            media_url: Some("x".into()),
            seen_by: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_direct_room_shows_other_member() {
        let (me, other) = (Uuid::new_v4(), Uuid::new_v4());
        let peer = UserRecord {
            id: other,
            username: "bob".into(),
            avatar_url: "bob.png".into(),
            push_identifiers: vec![],
        };
        let summary = build_summary(&room(vec![me, other], false), None, 0, None, Some(&peer));
        assert_eq!(summary.display_name, "bob");
        assert_eq!(summary.display_avatar.as_deref(), Some("bob.png"));
        assert!(!summary.is_group);
        assert_eq!(summary.last_message_text, None);
    }

    #[test]
    fn test_project_room_shows_project_name() {
        let me = Uuid::new_v4();
        let members = vec![me, Uuid::new_v4(), Uuid::new_v4()];
        let summary = build_summary(&room(members, true), None, 0, Some("Apollo"), None);
        assert_eq!(summary.display_name, "Apollo");
        assert!(!summary.is_group);
    }

    #[test]
    fn test_group_uses_room_name_and_media_label() {
        let me = Uuid::new_v4();
        let members = vec![me, Uuid::new_v4(), Uuid::new_v4()];
        let last = message(MessageKind::Audio, None);
        let summary = build_summary(&room(members, false), Some(&last), 3, None, None);
        assert_eq!(summary.display_name, "Room");
        assert!(summary.is_group);
        assert_eq!(summary.last_message_text.as_deref(), Some("Voice message"));
        assert_eq!(summary.unread_count, 3);
    }
}
