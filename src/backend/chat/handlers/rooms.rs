/**
 * Room Handlers
 *
 * # Routes
 *
 * - `GET /api/chat/my-rooms` - room list of the caller, most recent first
 * - `POST /api/chat/rooms` - create an ad-hoc room
 * - `GET /api/chat/project/{project_id}/room` - the project's room
 */

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::backend::chat::service::ChatService;
use crate::backend::error::BackendResult;
use crate::backend::middleware::{AuthUser, ValidJson};
use crate::shared::messaging::{ChatRoom, CreateRoomRequest, RoomSummary};

/// List the caller's rooms with last message preview and unread count
pub async fn list_my_rooms(
    State(chat): State<ChatService>,
    AuthUser(identity): AuthUser,
) -> BackendResult<Json<Vec<RoomSummary>>> {
    let rooms = chat.list_rooms(identity.user_id).await?;
    Ok(Json(rooms))
}

/// Create a room with the caller and `memberIds`
///
/// # Example Request
///
/// ```http
/// POST /api/chat/rooms HTTP/1.1
/// Authorization: Bearer <token>
/// Content-Type: application/json
///
/// {"name":"Launch crew","memberIds":["..."]}
/// ```
///
/// # Errors
///
/// * `400 Bad Request` - blank name
/// * `401 Unauthorized` - missing or invalid token
pub async fn create_room(
    State(chat): State<ChatService>,
    AuthUser(identity): AuthUser,
    ValidJson(request): ValidJson<CreateRoomRequest>,
) -> BackendResult<(StatusCode, Json<ChatRoom>)> {
    let room = chat.create_room(identity.user_id, &request).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

/// Get, or lazily create, a project's room
///
/// # Errors
///
/// * `403 Forbidden` - caller is neither owner nor member of the project
/// * `404 Not Found` - no such project
pub async fn get_project_room(
    State(chat): State<ChatService>,
    AuthUser(identity): AuthUser,
    Path(project_id): Path<Uuid>,
) -> BackendResult<Json<ChatRoom>> {
    let room = chat.project_room(project_id, identity.user_id).await?;
    Ok(Json(room))
}
