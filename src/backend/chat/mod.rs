//! Chat Backend Module
//!
//! Rooms, messages and read receipts.
//!
//! # Architecture
//!
//! - **`db`** - SQLite persistence for rooms, members, messages and receipts
//! - **`summary`** - Per-user room list with previews and unread counts
//! - **`events`** - Project events mirrored onto project rooms
//! - **`service`** - `ChatService`: persist, broadcast, notify
//! - **`handlers`** - HTTP endpoints
//!
//! # Example
//!
//! ```rust,no_run
//! use sentinel_chat::backend::chat::db;
//! use sentinel_chat::shared::messaging::NewMessage;
//! # use uuid::Uuid;
//!
//! # async fn example(pool: sqlx::SqlitePool, alice: Uuid, bob: Uuid) -> Result<(), Box<dyn std::error::Error>> {
//! let room = db::create_room(&pool, "pair", &[bob], alice, None).await?;
//! db::append_message(&pool, room.id, alice, &NewMessage::text("hi")?).await?;
//! assert_eq!(db::unread_count(&pool, room.id, bob).await?, 1);
//! # Ok(())
//! # }
//! ```

/// Database operations for rooms and messages
pub mod db;

/// Room list aggregation
pub mod summary;

/// Project event listener
pub mod events;

/// Chat service
pub mod service;

/// HTTP handlers
pub mod handlers;

pub use events::{apply_project_event, spawn_project_listener, ProjectEvent, ProjectNotifier};
pub use service::ChatService;
