//! Shared Module
//!
//! Types shared between the server and its clients. Nothing in here depends
//! on the server stack: these are the JSON shapes of rooms, messages and
//! real-time frames, plus configuration and validation errors.

/// Real-time event frames
pub mod event;

/// Shared error types
pub mod error;

/// Server configuration
pub mod config;

/// Room and message types
pub mod messaging;

pub use config::{ConfigError, ServerConfig, ServerConfigBuilder};
pub use error::SharedError;
pub use event::{ClientEvent, ServerEvent};
