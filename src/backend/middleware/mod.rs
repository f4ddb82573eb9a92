//! Middleware Module
//!
//! Request processing shared by the HTTP handlers.
//!
//! - **`auth`** - `AuthUser` extractor for bearer token authentication
//! - **`json`** - `ValidJson` body extractor with validation-style rejections

pub mod auth;
pub mod json;

pub use auth::{bearer_token, AuthUser};
pub use json::ValidJson;
