// Increase recursion limit for complex async operations
#![recursion_limit = "256"]

//! Sentinel Chat - Main Library
//!
//! Real-time messaging and notification backend for project collaboration:
//! chat rooms backed by projects or created ad hoc, message persistence with
//! read receipts, live presence and room multiplexing over WebSocket, and push
//! notification fan-out to FCM and OneSignal.
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared between server and clients
//!   - Room and message structures, WebSocket frames
//!   - Configuration and validation errors
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Axum HTTP/WebSocket server
//!   - SQLite persistence through sqlx
//!   - Presence tracking and per-room broadcast
//!   - Push providers and notification fan-out
//!
//! # Feature Flags
//!
//! - **`ssr`** (default) - enables the backend modules and the server binary
//!
//! # Usage
//!
//! ```rust,no_run
//! use sentinel_chat::backend::server::init::create_app;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (app, config) = create_app().await?;
//! let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.server_port)).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Ordering Guarantees
//!
//! Sending a message always runs in the same order: the message is persisted,
//! then broadcast to the room, then push notifications are dispatched in the
//! background. A failed write stops the sequence.

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
