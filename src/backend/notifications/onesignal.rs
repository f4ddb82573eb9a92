/**
 * OneSignal Provider
 *
 * Posts to `/api/v1/notifications` with `include_player_ids`, at most
 * 2000 player IDs per request. Player IDs listed under
 * `errors.invalid_player_ids` in the response count as failures; when the
 * response has no notification id and a list of errors, the whole chunk
 * failed.
 */

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::backend::error::{BackendError, BackendResult};
use crate::backend::notifications::provider::{BatchResult, PushPayload, PushProvider, PushProviderKind};
use crate::shared::config::OneSignalConfig;

/// Largest `include_player_ids` list accepted per request
pub const MAX_PLAYERS_PER_REQUEST: usize = 2000;

#[derive(Serialize)]
struct Localized<'a> {
    en: &'a str,
}

#[derive(Serialize)]
struct CreateNotification<'a> {
    app_id: &'a str,
    include_player_ids: &'a [String],
    headings: Localized<'a>,
    contents: Localized<'a>,
    data: &'a std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct CreateNotificationResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    errors: Option<serde_json::Value>,
}

impl CreateNotificationResponse {
    fn invalid_player_ids(&self) -> Vec<String> {
        self.errors
            .as_ref()
            .and_then(|e| e.get("invalid_player_ids"))
            .and_then(|ids| ids.as_array())
            .map(|ids| ids.iter().filter_map(|id| id.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }

    /// Errors reported as a plain list, e.g. "All included players are not subscribed"
    fn error_messages(&self) -> Vec<String> {
        self.errors
            .as_ref()
            .and_then(|e| e.as_array())
            .map(|list| list.iter().filter_map(|m| m.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }
}

pub struct OneSignalProvider {
    client: reqwest::Client,
    app_id: String,
    api_key: String,
    endpoint: String,
}

impl OneSignalProvider {
    pub fn from_config(config: &OneSignalConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            app_id: config.app_id.clone(),
            api_key: config.api_key.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        }
    }

    async fn send_chunk(&self, players: &[String], payload: &PushPayload, result: &mut BatchResult) -> BackendResult<()> {
        let body = CreateNotification {
            app_id: &self.app_id,
            include_player_ids: players,
            headings: Localized { en: &payload.title },
            contents: Localized { en: &payload.body },
            data: &payload.data,
        };

        let response = self
            .client
            .post(format!("{}/api/v1/notifications", self.endpoint))
            .header(reqwest::header::AUTHORIZATION, format!("Basic {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::provider("onesignal", format!("request failed: {}", e)))?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) || status.is_server_error() {
            return Err(BackendError::provider("onesignal", format!("request rejected: {}", status)));
        }

        let text = response.text().await.unwrap_or_default();
        let parsed: CreateNotificationResponse = serde_json::from_str(&text).unwrap_or_default();

        if !status.is_success() {
            let reason = parsed.error_messages().join("; ");
            let reason = if reason.is_empty() { status.to_string() } else { reason };
            for player in players {
                result.record_failure(player.as_str(), reason.as_str());
            }
            return Ok(());
        }

        let messages = parsed.error_messages();
        if parsed.id.as_deref().unwrap_or_default().is_empty() && !messages.is_empty() {
            let reason = messages.join("; ");
            for player in players {
                result.record_failure(player.as_str(), reason.as_str());
            }
            return Ok(());
        }

        let invalid = parsed.invalid_player_ids();
        for player in players {
            if invalid.contains(player) {
                result.record_failure(player.as_str(), "invalid_player_id");
            } else {
                result.record_success();
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PushProvider for OneSignalProvider {
    fn kind(&self) -> PushProviderKind {
        PushProviderKind::OneSignal
    }

    async fn send_batch(&self, identifiers: &[String], payload: &PushPayload) -> BackendResult<BatchResult> {
        let mut result = BatchResult::default();
        for chunk in identifiers.chunks(MAX_PLAYERS_PER_REQUEST) {
            self.send_chunk(chunk, payload, &mut result).await?;
        }

        tracing::info!(
            "[Notifications] OneSignal sent: success={}, failure={}",
            result.success_count,
            result.failure_count
        );
        Ok(result)
    }
}
