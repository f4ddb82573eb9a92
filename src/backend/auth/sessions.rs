/**
 * Session Tokens
 *
 * HS256 JWTs whose `sub` claim is the user ID. Tokens are issued by the
 * account system; this module verifies them and can mint them for tooling
 * and tests.
 */

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::error::{BackendError, BackendResult};

/// Default lifetime of minted tokens
pub const TOKEN_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

fn now_secs() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}

/// Create a token for a user, valid for `ttl_secs`
pub fn create_token(secret: &str, user_id: Uuid, ttl_secs: u64) -> Result<String, jsonwebtoken::errors::Error> {
    let now = now_secs();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + ttl_secs,
        iat: now,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
}

/// Verify signature and expiry, returning the claims
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &key, &Validation::default())?;
    Ok(token_data.claims)
}

/// Extract the user ID from a verified token
pub fn user_id_from_token(secret: &str, token: &str) -> BackendResult<Uuid> {
    let claims = verify_token(secret, token).map_err(|e| {
        tracing::debug!("[Auth] Token verification failed: {}", e);
        BackendError::auth("Invalid or expired token")
    })?;
    Uuid::parse_str(&claims.sub).map_err(|_| BackendError::auth("Invalid user ID in token"))
}
