/**
 * Authentication Extractor
 *
 * HTTP handlers take an `AuthUser` argument to require a caller identity.
 * The token comes from `Authorization: Bearer <token>` and is verified by
 * the same `IdentityVerifier` the WebSocket gateway uses. Failures are
 * rejected with `401` and the usual JSON error body.
 */

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use crate::backend::auth::Identity;
use crate::backend::error::{BackendError, BackendResult};
use crate::backend::server::state::AppState;

/// Bearer token of a request
pub fn bearer_token(headers: &HeaderMap) -> BackendResult<&str> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| BackendError::auth("Missing Authorization header"))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| BackendError::auth("Invalid Authorization header format"))
}

/// Axum extractor for the verified caller
#[derive(Clone, Debug)]
pub struct AuthUser(pub Identity);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = BackendError;

    async fn from_request_parts(parts: &mut Parts, app_state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let identity = app_state.identity.verify(token).await.map_err(|e| {
            tracing::debug!("[Auth] Rejected request to {}: {}", parts.uri.path(), e);
            e
        })?;
        Ok(AuthUser(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc")).unwrap(), "abc");
        assert_matches!(bearer_token(&headers("Basic abc")), Err(BackendError::Auth { .. }));
        assert_matches!(bearer_token(&headers("Bearer ")), Err(BackendError::Auth { .. }));
        assert_matches!(bearer_token(&HeaderMap::new()), Err(BackendError::Auth { .. }));
    }
}
