/**
 * API Routes
 *
 * ## Chat
 * - `GET /api/chat/my-rooms` - room list of the caller
 * - `POST /api/chat/rooms` - create a room
 * - `GET /api/chat/project/{project_id}/room` - project room
 * - `GET /api/chat/rooms/{room_id}/messages?limit=` - message history
 * - `POST /api/chat/rooms/{room_id}/messages` - send a message
 * - `POST /api/chat/rooms/{room_id}/members` - add a member
 * - `DELETE /api/chat/rooms/{room_id}/members/{user_id}` - remove a member
 *
 * ## Notifications
 * - `POST /api/notifications/token` - register a push identifier
 * - `POST /api/notifications/test` - send a test push to the caller
 *
 * All of them require `Authorization: Bearer <token>`.
 */

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::backend::chat::handlers::{
    add_member, create_room, get_project_room, list_messages, list_my_rooms, remove_member, send_message,
};
use crate::backend::notifications::handlers::{register_push_token, send_test_notification};
use crate::backend::server::state::AppState;

/// Add the chat and notification endpoints to `router`
pub fn configure_api_routes(router: Router<AppState>) -> Router<AppState> {
    router
        // Rooms
        .route("/api/chat/my-rooms", get(list_my_rooms))
        .route("/api/chat/rooms", post(create_room))
        .route("/api/chat/project/{project_id}/room", get(get_project_room))
        // Messages
        .route(
            "/api/chat/rooms/{room_id}/messages",
            get(list_messages).post(send_message),
        )
        // Membership
        .route("/api/chat/rooms/{room_id}/members", post(add_member))
        .route("/api/chat/rooms/{room_id}/members/{user_id}", delete(remove_member))
        // Push notifications
        .route("/api/notifications/token", post(register_push_token))
        .route("/api/notifications/test", post(send_test_notification))
}
