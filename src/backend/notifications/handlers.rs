//! Notification HTTP Handlers
//!
//! Push identifier registration for the caller's device and a test push.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::backend::directory::{PushIdentifier, UserDirectory};
use crate::backend::error::{BackendError, BackendResult};
use crate::backend::middleware::{AuthUser, ValidJson};
use crate::backend::notifications::provider::{PushPayload, PushProviderKind};
use crate::backend::notifications::service::{DeliveryReport, NotificationService};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterTokenRequest {
    pub provider: PushProviderKind,
    pub identifier: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterTokenResponse {
    /// `false` when the identifier was already registered
    pub registered: bool,
}

/// Record an FCM token or OneSignal player id for the caller
pub async fn register_push_token(
    State(users): State<Arc<dyn UserDirectory>>,
    AuthUser(identity): AuthUser,
    ValidJson(request): ValidJson<RegisterTokenRequest>,
) -> BackendResult<Json<RegisterTokenResponse>> {
    let identifier = request.identifier.trim();
    if identifier.is_empty() {
        return Err(BackendError::validation("identifier is required"));
    }

    let registered = users
        .register_push_identifier(identity.user_id, PushIdentifier::new(request.provider, identifier))
        .await?;

    tracing::info!(
        "[Notifications] {} identifier for user {} (new: {})",
        request.provider,
        identity.user_id,
        registered
    );
    Ok(Json(RegisterTokenResponse { registered }))
}

/// Send a test notification to every device of the caller
pub async fn send_test_notification(
    State(notifications): State<NotificationService>,
    AuthUser(identity): AuthUser,
) -> Json<DeliveryReport> {
    let payload = PushPayload::new("Test Notification", "Push notifications are working")
        .with_data("type", "test");

    let report = notifications.notify(&[identity.user_id], None, &payload).await;
    Json(report)
}
