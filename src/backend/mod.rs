//! Backend Module
//!
//! All server-side code: the Axum HTTP/WebSocket server, SQLite persistence,
//! presence and room broadcasting, and push notification fan-out.
//!
//! This module is only compiled when the `ssr` feature is enabled.
//!
//! # Architecture
//!
//! - **`server`** - Server initialization, application state, database setup
//! - **`routes`** - HTTP route configuration and router assembly
//! - **`chat`** - Rooms, messages, read receipts, project rooms
//! - **`gateway`** - WebSocket connections
//! - **`realtime`** - Presence tracking and per-room broadcast channels
//! - **`notifications`** - Push providers and fan-out
//! - **`directory`** - User and project lookups
//! - **`auth`** - Token verification
//! - **`middleware`** - Request authentication
//! - **`error`** - Backend error type and HTTP conversion
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── main.rs         - Server binary
//! ├── server/         - Initialization and state
//! ├── routes/         - Route configuration
//! ├── chat/           - Room and message store, service, handlers
//! ├── gateway/        - WebSocket sessions
//! ├── realtime/       - Presence and room hub
//! ├── notifications/  - FCM, OneSignal, fan-out
//! ├── directory/      - Users and projects
//! ├── auth/           - Identity verification
//! ├── middleware/     - AuthUser extractor
//! └── error/          - Error types
//! ```
//!
//! # Dependencies
//!
//! - `axum` - HTTP and WebSocket server
//! - `tokio` / `tokio-stream` - async runtime, channels, stream multiplexing
//! - `sqlx` - SQLite access and migrations
//! - `reqwest` - push provider HTTP calls
//! - `jsonwebtoken` - session tokens and FCM service account assertions
//! - `tracing` - logging

/// Server initialization and state management
pub mod server;

/// Route configuration
pub mod routes;

/// Rooms and messages
pub mod chat;

/// WebSocket gateway
pub mod gateway;

/// Presence and per-room broadcasting
pub mod realtime;

/// Push notifications
pub mod notifications;

/// User and project directories
pub mod directory;

/// Identity verification
pub mod auth;

/// Request middleware
pub mod middleware;

/// Backend error types
pub mod error;
