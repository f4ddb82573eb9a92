//! Route Configuration Module
//!
//! # Module Structure
//!
//! ```text
//! routes/
//! ├── mod.rs        - Module exports and documentation
//! ├── router.rs     - Main router creation, layers, health check
//! └── api_routes.rs - Chat and notification endpoints
//! ```
//!
//! The WebSocket gateway is mounted at `GET /ws` by `router`.

/// Main router creation
pub mod router;

/// API endpoints
pub mod api_routes;

pub use router::create_router;
