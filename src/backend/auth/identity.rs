/**
 * Identity Verification
 *
 * Turns a signed token into an `Identity`. Both the WebSocket gateway and
 * the HTTP `AuthUser` extractor go through the same `IdentityVerifier`.
 */

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::auth::sessions::user_id_from_token;
use crate::backend::directory::UserDirectory;
use crate::backend::error::{BackendError, BackendResult};
use crate::shared::messaging::SenderProfile;

/// A verified caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: Uuid,
    pub display_name: String,
    pub avatar_url: String,
}

impl Identity {
    pub fn profile(&self) -> SenderProfile {
        SenderProfile {
            id: self.user_id,
            username: self.display_name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify `token`, failing with `BackendError::Auth`
    async fn verify(&self, token: &str) -> BackendResult<Identity>;
}

/// Verifies HS256 tokens and resolves the subject through the user directory
pub struct JwtIdentityVerifier {
    secret: String,
    users: Arc<dyn UserDirectory>,
}

impl JwtIdentityVerifier {
    pub fn new(secret: impl Into<String>, users: Arc<dyn UserDirectory>) -> Self {
        Self {
            secret: secret.into(),
            users,
        }
    }
}

#[async_trait]
impl IdentityVerifier for JwtIdentityVerifier {
    async fn verify(&self, token: &str) -> BackendResult<Identity> {
        let user_id = user_id_from_token(&self.secret, token)?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| BackendError::auth("Unknown user"))?;

        Ok(Identity {
            user_id: user.id,
            display_name: user.username,
            avatar_url: user.avatar_url,
        })
    }
}
