//! Notifications Module
//!
//! Best-effort push delivery to users who are not watching a room live.
//!
//! # Module Structure
//!
//! ```text
//! notifications/
//! ├── mod.rs       - Module exports and provider construction
//! ├── provider.rs  - PushProvider trait and shared result types
//! ├── fcm.rs       - Firebase Cloud Messaging (HTTP v1)
//! ├── onesignal.rs - OneSignal REST API
//! ├── service.rs   - NotificationService fan-out
//! └── handlers.rs  - Token registration and test push endpoints
//! ```

pub mod fcm;
pub mod handlers;
pub mod onesignal;
pub mod provider;
pub mod service;

use std::sync::Arc;

use crate::shared::ServerConfig;

pub use fcm::FcmProvider;
pub use onesignal::OneSignalProvider;
pub use provider::{BatchResult, IdentifierError, PushPayload, PushProvider, PushProviderKind};
pub use service::{DeliveryReport, NotificationService, ProviderReport, ProviderStatus};

/// Providers enabled by the configuration.
///
/// A missing or unusable provider configuration disables that provider
/// with a warning; it never fails startup.
pub fn build_providers(config: &ServerConfig) -> Vec<Arc<dyn PushProvider>> {
    let mut providers: Vec<Arc<dyn PushProvider>> = Vec::new();

    match &config.fcm {
        Some(fcm) => match FcmProvider::from_config(fcm) {
            Ok(provider) => providers.push(Arc::new(provider)),
            Err(e) => tracing::warn!("[Notifications] FCM disabled: {}", e),
        },
        None => tracing::warn!("[Notifications] FCM credentials not configured, FCM disabled"),
    }

    match &config.onesignal {
        Some(onesignal) => providers.push(Arc::new(OneSignalProvider::from_config(onesignal))),
        None => tracing::warn!("[Notifications] OneSignal credentials not configured, OneSignal disabled"),
    }

    tracing::info!(
        "[Notifications] Enabled providers: {:?}",
        providers.iter().map(|p| p.kind().as_str()).collect::<Vec<_>>()
    );
    providers
}
