//! Real-time Module
//!
//! In-memory, per-process real-time state: who is online and which
//! connections listen to which room.
//!
//! # Module Structure
//!
//! ```text
//! realtime/
//! ├── mod.rs       - Module exports and documentation
//! ├── broadcast.rs - Per-room broadcast channels (RoomHub)
//! └── presence.rs  - Connection counting per user (PresenceTracker)
//! ```
//!
//! Both types are cheap to clone and live in `AppState`.

/// Per-room event broadcasting
pub mod broadcast;

/// Presence tracking
pub mod presence;

pub use broadcast::{RoomEvent, RoomHub};
pub use presence::{PresenceChange, PresenceGuard, PresenceTracker};
