/**
 * Firebase Cloud Messaging Provider
 *
 * Sends through the FCM HTTP v1 API, one request per device token, all
 * tokens of a batch in flight concurrently (the v1 API has no multicast
 * endpoint).
 *
 * # Credentials
 *
 * - A static OAuth access token plus project ID, or
 * - a service account key, exchanged for an access token with a signed
 *   RS256 JWT assertion. The token is cached until shortly before expiry.
 *
 * # Failure classification
 *
 * - 401 on any token, 403 on every token, or transport errors on every
 *   token: the whole provider is unavailable (`BackendError::Provider`)
 * - 403 `SENDER_ID_MISMATCH`, a 403 while other tokens go through, or any
 *   other non-success status: failure of that token only
 */

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::backend::error::{BackendError, BackendResult};
use crate::backend::notifications::provider::{BatchResult, PushPayload, PushProvider, PushProviderKind};
use crate::shared::config::{FcmConfig, FcmCredentials};

const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Fields of a Google service account key file used for the token exchange
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

enum Credentials {
    Static(String),
    ServiceAccount(ServiceAccountKey),
}

struct CachedToken {
    token: String,
    refresh_at: Instant,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Serialize)]
struct SendRequest<'a> {
    message: FcmMessage<'a>,
}

#[derive(Serialize)]
struct FcmMessage<'a> {
    token: &'a str,
    notification: FcmNotification<'a>,
    data: &'a std::collections::BTreeMap<String, String>,
}

#[derive(Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
}

enum TokenOutcome {
    Delivered,
    Rejected(String),
    Unauthorized(String),
    Forbidden(String),
    Unreachable(String),
}

pub struct FcmProvider {
    client: reqwest::Client,
    endpoint: String,
    project_id: String,
    credentials: Credentials,
    cached: Mutex<Option<CachedToken>>,
}

impl FcmProvider {
    /// Build from configuration; a malformed service account key is an error
    pub fn from_config(config: &FcmConfig) -> BackendResult<Self> {
        let (project_id, credentials) = match &config.credentials {
            FcmCredentials::AccessToken { project_id, token } => {
                (project_id.clone(), Credentials::Static(token.clone()))
            }
            FcmCredentials::ServiceAccount { json } => {
                let key: ServiceAccountKey = serde_json::from_str(json).map_err(|e| {
                    BackendError::provider("fcm", format!("invalid service account key: {}", e))
                })?;
                (key.project_id.clone(), Credentials::ServiceAccount(key))
            }
        };

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            project_id,
            credentials,
            cached: Mutex::new(None),
        })
    }

    fn cached_token(&self) -> Option<String> {
        let cached = self.cached.lock().unwrap_or_else(|p| p.into_inner());
        cached
            .as_ref()
            .filter(|c| Instant::now() < c.refresh_at)
            .map(|c| c.token.clone())
    }

    async fn access_token(&self) -> BackendResult<String> {
        let key = match &self.credentials {
            Credentials::Static(token) => return Ok(token.clone()),
            Credentials::ServiceAccount(key) => key,
        };

        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &key.client_email,
            scope: FCM_SCOPE,
            aud: &key.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| BackendError::provider("fcm", format!("invalid private key: {}", e)))?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .map_err(|e| BackendError::provider("fcm", format!("failed to sign assertion: {}", e)))?;

        let response = self
            .client
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| BackendError::provider("fcm", format!("token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(BackendError::provider(
                "fcm",
                format!("token exchange rejected: {}", response.status()),
            ));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| BackendError::provider("fcm", format!("bad token response: {}", e)))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        *self.cached.lock().unwrap_or_else(|p| p.into_inner()) = Some(CachedToken {
            token: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        tracing::debug!("[Notifications] Refreshed FCM access token");

        Ok(token.access_token)
    }

    async fn send_one(&self, url: &str, access_token: &str, device_token: &str, payload: &PushPayload) -> TokenOutcome {
        let request = SendRequest {
            message: FcmMessage {
                token: device_token,
                notification: FcmNotification {
                    title: &payload.title,
                    body: &payload.body,
                },
                data: &payload.data,
            },
        };

        let response = match self.client.post(url).bearer_auth(access_token).json(&request).send().await {
            Ok(response) => response,
            Err(e) => return TokenOutcome::Unreachable(e.to_string()),
        };

        let status = response.status();
        if status.is_success() {
            return TokenOutcome::Delivered;
        }

        let body = response.text().await.unwrap_or_default();
        let reason = error_status(&body).unwrap_or_else(|| status.to_string());
        match status {
            StatusCode::UNAUTHORIZED => TokenOutcome::Unauthorized(reason),
            StatusCode::FORBIDDEN if reason == "SENDER_ID_MISMATCH" => TokenOutcome::Rejected(reason),
            StatusCode::FORBIDDEN => TokenOutcome::Forbidden(reason),
            _ => TokenOutcome::Rejected(reason),
        }
    }
}

/// `error.status` of an FCM error body, e.g. `UNREGISTERED`
fn error_status(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    error
        .get("details")
        .and_then(|d| d.as_array())
        .and_then(|details| details.iter().find_map(|d| d.get("errorCode")?.as_str()))
        .or_else(|| error.get("status")?.as_str())
        .map(str::to_string)
}

#[async_trait]
impl PushProvider for FcmProvider {
    fn kind(&self) -> PushProviderKind {
        PushProviderKind::Fcm
    }

    async fn send_batch(&self, identifiers: &[String], payload: &PushPayload) -> BackendResult<BatchResult> {
        let mut result = BatchResult::default();
        if identifiers.is_empty() {
            return Ok(result);
        }

        let access_token = self.access_token().await?;
        let url = format!("{}/v1/projects/{}/messages:send", self.endpoint, self.project_id);

        let outcomes = join_all(
            identifiers
                .iter()
                .map(|token| self.send_one(&url, &access_token, token, payload)),
        )
        .await;

        if outcomes.iter().all(|o| matches!(o, TokenOutcome::Forbidden(_))) {
            return Err(BackendError::provider("fcm", "credentials rejected for every token"));
        }

        let mut unreachable = 0;
        for (token, outcome) in identifiers.iter().zip(outcomes) {
            match outcome {
                TokenOutcome::Delivered => result.record_success(),
                TokenOutcome::Rejected(reason) | TokenOutcome::Forbidden(reason) => {
                    result.record_failure(token.as_str(), reason)
                }
                TokenOutcome::Unauthorized(reason) => {
                    return Err(BackendError::provider("fcm", format!("credentials rejected: {}", reason)));
                }
                TokenOutcome::Unreachable(reason) => {
                    unreachable += 1;
                    result.record_failure(token.as_str(), reason);
                }
            }
        }

        if unreachable == identifiers.len() {
            return Err(BackendError::provider("fcm", "FCM endpoint unreachable"));
        }

        tracing::info!(
            "[Notifications] FCM sent: success={}, failure={}",
            result.success_count,
            result.failure_count
        );
        Ok(result)
    }
}
