//! Chat Handlers Module
//!
//! Axum handlers for the room and message endpoints. Every handler
//! authenticates through the `AuthUser` extractor and delegates to
//! `ChatService`.
//!
//! # Module Structure
//!
//! ```text
//! handlers/
//! ├── mod.rs      - Module exports and documentation
//! ├── rooms.rs    - Room list, room creation, project rooms
//! ├── messages.rs - Message history and sending
//! └── members.rs  - Room membership changes
//! ```
//!
//! # Route Handlers
//!
//! - `GET /api/chat/my-rooms` - [`list_my_rooms`]
//! - `POST /api/chat/rooms` - [`create_room`]
//! - `GET /api/chat/project/{project_id}/room` - [`get_project_room`]
//! - `GET /api/chat/rooms/{room_id}/messages` - [`list_messages`]
//! - `POST /api/chat/rooms/{room_id}/messages` - [`send_message`]
//! - `POST /api/chat/rooms/{room_id}/members` - [`add_member`]
//! - `DELETE /api/chat/rooms/{room_id}/members/{user_id}` - [`remove_member`]

/// Room list and room creation
pub mod rooms;

/// Message history and sending
pub mod messages;

/// Membership changes
pub mod members;

pub use members::{add_member, remove_member};
pub use messages::{list_messages, send_message};
pub use rooms::{create_room, get_project_room, list_my_rooms};
