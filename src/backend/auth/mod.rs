//! Authentication Module
//!
//! Identity is established from a signed token issued by the account system.
//! Passwords and sign-up live elsewhere.
//!
//! - **`sessions`** - JWT creation and verification
//! - **`identity`** - `IdentityVerifier` and its JWT + user directory implementation

/// JWT token generation and validation
pub mod sessions;

/// Token to identity resolution
pub mod identity;

pub use identity::{Identity, IdentityVerifier, JwtIdentityVerifier};
pub use sessions::{create_token, verify_token, Claims};
