use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::backend::chat::service::ChatService;
use crate::backend::error::BackendResult;
use crate::backend::middleware::{AuthUser, ValidJson};
use crate::shared::messaging::{AddMemberRequest, ChatRoom};

/// Add `userId` to a room the caller belongs to
pub async fn add_member(
    State(chat): State<ChatService>,
    AuthUser(identity): AuthUser,
    Path(room_id): Path<Uuid>,
    ValidJson(request): ValidJson<AddMemberRequest>,
) -> BackendResult<Json<ChatRoom>> {
    let room = chat.add_member(room_id, identity.user_id, request.user_id).await?;
    Ok(Json(room))
}

/// Remove a member; removing someone who already left is not an error
pub async fn remove_member(
    State(chat): State<ChatService>,
    AuthUser(identity): AuthUser,
    Path((room_id, user_id)): Path<(Uuid, Uuid)>,
) -> BackendResult<Json<ChatRoom>> {
    let room = chat.remove_member(room_id, identity.user_id, user_id).await?;
    Ok(Json(room))
}
