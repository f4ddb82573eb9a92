//! Server Module
//!
//! Server initialization and the application state shared by every handler.
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs    - Module exports and documentation
//! ├── state.rs  - AppState and FromRef implementations
//! ├── config.rs - Database connection and migrations
//! └── init.rs   - Server initialization and app creation
//! ```
//!
//! # Initialization Flow
//!
//! 1. **Configuration Loading**: `ServerConfig::from_env`
//! 2. **Database**: SQLite pool plus migrations
//! 3. **State Creation**: presence tracker, room hub, directories, services
//! 4. **Background Tasks**: project event listener, idle channel cleanup
//! 5. **Router Creation**: routes, CORS and request tracing

/// Application state management
pub mod state;

/// Database setup
pub mod config;

/// Server initialization
pub mod init;

pub use init::{create_app, StartupError};
pub use state::AppState;
