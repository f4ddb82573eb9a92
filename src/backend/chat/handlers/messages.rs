/**
 * Message Handlers
 *
 * `GET` returns the latest page of a room in chronological order and marks
 * it read; `POST` appends a message, relays it to live subscribers of the
 * room and notifies the other members by push.
 */

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::backend::chat::service::ChatService;
use crate::backend::error::BackendResult;
use crate::backend::middleware::{AuthUser, ValidJson};
use crate::shared::messaging::{ListMessagesQuery, MessageView, SendMessageRequest};

/// Handle `GET /api/chat/rooms/{room_id}/messages?limit=`
///
/// `limit` defaults to 30 and is clamped to 1..=100.
pub async fn list_messages(
    State(chat): State<ChatService>,
    AuthUser(identity): AuthUser,
    Path(room_id): Path<Uuid>,
    Query(query): Query<ListMessagesQuery>,
) -> BackendResult<Json<Vec<MessageView>>> {
    let messages = chat.fetch_messages(room_id, identity.user_id, query.limit).await?;
    Ok(Json(messages))
}

/// Handle `POST /api/chat/rooms/{room_id}/messages`
///
/// # Example Request
///
/// ```http
/// POST /api/chat/rooms/7c1e.../messages HTTP/1.1
/// Authorization: Bearer <token>
/// Content-Type: application/json
///
/// {"type":"image","mediaUrl":"https://cdn.example/cat.png","senderDevice":"fcm-token"}
/// ```
///
/// # Errors
///
/// * `400 Bad Request` - content fails validation
/// * `403 Forbidden` - caller is not a member
/// * `404 Not Found` - no such room
pub async fn send_message(
    State(chat): State<ChatService>,
    AuthUser(identity): AuthUser,
    Path(room_id): Path<Uuid>,
    ValidJson(request): ValidJson<SendMessageRequest>,
) -> BackendResult<(StatusCode, Json<MessageView>)> {
    let view = chat.send_message(room_id, &identity, &request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}
