/**
 * Room and Message Operations
 *
 * `ChatService` composes the room store, the room hub and the notification
 * fan-out. Sending a message always runs in the same order:
 *
 * 1. persist (a failure here stops everything)
 * 2. emit `message_new` to the room's live subscribers
 * 3. push-notify the other members in a background task
 *
 * The caller's response only depends on step 1.
 */

use std::collections::HashMap;
use std::sync::Arc;

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::backend::auth::Identity;
use crate::backend::chat::{db, summary};
use crate::backend::directory::{ProjectDirectory, UserDirectory};
use crate::backend::error::{BackendError, BackendResult};
use crate::backend::notifications::{NotificationService, PushPayload};
use crate::backend::realtime::{RoomEvent, RoomHub};
use crate::shared::messaging::{
    ChatMessage, ChatRoom, CreateRoomRequest, MessageView, NewMessage, RoomSummary, SendMessageRequest,
    SenderProfile,
};
use crate::shared::ServerEvent;

pub const DEFAULT_MESSAGE_LIMIT: u32 = 30;
pub const MAX_MESSAGE_LIMIT: u32 = 100;

/// Page size for `fetch_messages`: 30 when absent, clamped to 1..=100
pub fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_MESSAGE_LIMIT).clamp(1, MAX_MESSAGE_LIMIT)
}

/// Push payload announcing `message` to the other members of `room`
pub fn notification_payload(room: &ChatRoom, sender_name: &str, message: &ChatMessage) -> PushPayload {
    let title = if room.is_project_room {
        format!("Project: {}", room.name)
    } else {
        format!("New message from {}", sender_name)
    };

    PushPayload::new(title, message.preview())
        .with_data("type", "chat")
        .with_data("roomId", room.id.to_string())
}

#[derive(Clone)]
pub struct ChatService {
    pool: SqlitePool,
    hub: RoomHub,
    users: Arc<dyn UserDirectory>,
    projects: Arc<dyn ProjectDirectory>,
    notifications: NotificationService,
}

impl ChatService {
    pub fn new(
        pool: SqlitePool,
        hub: RoomHub,
        users: Arc<dyn UserDirectory>,
        projects: Arc<dyn ProjectDirectory>,
        notifications: NotificationService,
    ) -> Self {
        Self {
            pool,
            hub,
            users,
            projects,
            notifications,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Persist, broadcast and notify
    pub async fn send_message(
        &self,
        room_id: Uuid,
        sender: &Identity,
        request: &SendMessageRequest,
    ) -> BackendResult<MessageView> {
        let content = NewMessage::try_from(request)?;
        let message = db::append_message(&self.pool, room_id, sender.user_id, &content).await?;
        let view = MessageView {
            message,
            sender: sender.profile(),
        };

        let receivers = self.hub.emit_to_room(
            room_id,
            RoomEvent::new(
                room_id,
                ServerEvent::MessageNew {
                    room_id,
                    message: view.clone(),
                },
            ),
        );
        tracing::debug!(
            "[Chat] Message {} in room {} reached {} live receivers",
            view.message.id,
            room_id,
            receivers
        );

        self.spawn_notification(sender, &view.message, request.sender_device.clone())
            .await;

        Ok(view)
    }

    async fn spawn_notification(&self, sender: &Identity, message: &ChatMessage, sender_device: Option<String>) {
        let room = match db::get_room(&self.pool, message.room_id).await {
            Ok(Some(room)) => room,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("[Chat] Skipping notifications for message {}: {}", message.id, e);
                return;
            }
        };

        let recipients: Vec<Uuid> = room.other_members(sender.user_id).collect();
        if recipients.is_empty() {
            return;
        }

        let payload = notification_payload(&room, &sender.display_name, message);
        let exclude: Vec<String> = sender_device.into_iter().collect();
        let notifications = self.notifications.clone();
        let sender_id = sender.user_id;

        tokio::spawn(async move {
            let report = notifications
                .notify_excluding(&recipients, Some(sender_id), &exclude, &payload)
                .await;
            tracing::debug!(
                "[Chat] Notified {} recipients: {} delivered, {} failed",
                report.recipients,
                report.success_count(),
                report.failure_count()
            );
        });
    }

    /// Most recent messages of a room in chronological order.
    ///
    /// Everything fetched is marked seen by the requester.
    pub async fn fetch_messages(
        &self,
        room_id: Uuid,
        requester: Uuid,
        limit: Option<u32>,
    ) -> BackendResult<Vec<MessageView>> {
        let room = self.member_room(room_id, requester).await?;

        let mut messages = db::recent_messages(&self.pool, room.id, clamp_limit(limit)).await?;
        messages.reverse();

        if let Some(newest) = messages.last() {
            db::mark_seen(&self.pool, room.id, requester, newest.created_at).await?;
            for message in messages.iter_mut() {
                if message.sender_id != requester && !message.is_seen_by(requester) {
                    message.seen_by.push(requester);
                }
            }
        }

        self.with_senders(messages).await
    }

    async fn with_senders(&self, messages: Vec<ChatMessage>) -> BackendResult<Vec<MessageView>> {
        let mut sender_ids: Vec<Uuid> = messages.iter().map(|m| m.sender_id).collect();
        sender_ids.sort_unstable();
        sender_ids.dedup();

        let profiles: HashMap<Uuid, SenderProfile> = self
            .users
            .find_by_ids(&sender_ids)
            .await?
            .into_iter()
            .map(|user| (user.id, user.profile()))
            .collect();

        Ok(messages
            .into_iter()
            .map(|message| {
                let sender = profiles
                    .get(&message.sender_id)
                    .cloned()
                    .unwrap_or_else(|| SenderProfile::unknown(message.sender_id));
                MessageView { message, sender }
            })
            .collect())
    }

    pub async fn list_rooms(&self, user_id: Uuid) -> BackendResult<Vec<RoomSummary>> {
        summary::list_rooms_for_user(&self.pool, self.users.as_ref(), self.projects.as_ref(), user_id).await
    }

    pub async fn create_room(&self, creator_id: Uuid, request: &CreateRoomRequest) -> BackendResult<ChatRoom> {
        let name = request.validated_name()?;
        let room = db::create_room(&self.pool, &name, &request.member_ids, creator_id, None).await?;
        tracing::info!("[Chat] User {} created room {} ({} members)", creator_id, room.id, room.member_ids.len());
        Ok(room)
    }

    /// The project's room, created on first access.
    ///
    /// The requester must be the project's owner or a member, and is added
    /// to the room if missing.
    pub async fn project_room(&self, project_id: Uuid, requester: Uuid) -> BackendResult<ChatRoom> {
        let project = self
            .projects
            .find_project(project_id)
            .await?
            .ok_or_else(|| BackendError::not_found("Project not found"))?;

        if !project.has_access(requester) {
            return Err(BackendError::forbidden("Not a member of this project"));
        }

        let mut room =
            db::get_or_create_project_room(&self.pool, project.id, project.owner_id, &project.name).await?;

        if !room.is_member(requester) {
            db::add_member(&self.pool, room.id, requester).await?;
            room.member_ids.push(requester);
        }
        Ok(room)
    }

    pub async fn add_member(&self, room_id: Uuid, requester: Uuid, user_id: Uuid) -> BackendResult<ChatRoom> {
        let room = self.member_room(room_id, requester).await?;
        if db::add_member(&self.pool, room.id, user_id).await? {
            tracing::info!("[Chat] {} added {} to room {}", requester, user_id, room_id);
        }
        self.reload(room_id).await
    }

    pub async fn remove_member(&self, room_id: Uuid, requester: Uuid, user_id: Uuid) -> BackendResult<ChatRoom> {
        let room = self.member_room(room_id, requester).await?;
        if db::remove_member(&self.pool, room.id, user_id).await? {
            tracing::info!("[Chat] {} removed {} from room {}", requester, user_id, room_id);
        }
        self.reload(room_id).await
    }

    /// The room, if it exists and `user_id` belongs to it
    async fn member_room(&self, room_id: Uuid, user_id: Uuid) -> BackendResult<ChatRoom> {
        let room = self.reload(room_id).await?;
        if !room.is_member(user_id) {
            return Err(BackendError::forbidden("Not a member of this room"));
        }
        Ok(room)
    }

    async fn reload(&self, room_id: Uuid) -> BackendResult<ChatRoom> {
        db::get_room(&self.pool, room_id)
            .await?
            .ok_or_else(|| BackendError::not_found("Room not found"))
    }
}
