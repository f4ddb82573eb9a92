/**
 * Push Provider Capability
 *
 * Every push channel (FCM, OneSignal) is a `PushProvider`: it reports its
 * kind and delivers one payload to a batch of identifiers. A provider-level
 * failure (unreachable, misconfigured, rejected credentials) is returned as
 * `BackendError::Provider`; failures of individual identifiers are reported
 * inside the `BatchResult`.
 */

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::backend::error::{BackendError, BackendResult};

/// Push channel an identifier belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum PushProviderKind {
    /// Firebase Cloud Messaging device token
    Fcm,
    /// OneSignal player (subscription) id
    #[serde(rename = "onesignal")]
    OneSignal,
}

impl PushProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PushProviderKind::Fcm => "fcm",
            PushProviderKind::OneSignal => "onesignal",
        }
    }
}

impl fmt::Display for PushProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PushProviderKind {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fcm" => Ok(PushProviderKind::Fcm),
            "onesignal" => Ok(PushProviderKind::OneSignal),
            other => Err(BackendError::validation(format!("unknown push provider '{}'", other))),
        }
    }
}

/// Notification content, identical for every provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    /// String key/value pairs delivered alongside the notification
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl PushPayload {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Failure to deliver to one identifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierError {
    pub identifier: String,
    pub error: String,
}

/// Outcome of one provider batch
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub errors: Vec<IdentifierError>,
}

impl BatchResult {
    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub fn record_failure(&mut self, identifier: impl Into<String>, error: impl Into<String>) {
        self.failure_count += 1;
        self.errors.push(IdentifierError {
            identifier: identifier.into(),
            error: error.into(),
        });
    }
}

/// A push delivery channel
#[async_trait]
pub trait PushProvider: Send + Sync {
    fn kind(&self) -> PushProviderKind;

    /// Deliver `payload` to every identifier. Only whole-provider failures are errors.
    async fn send_batch(&self, identifiers: &[String], payload: &PushPayload) -> BackendResult<BatchResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_str() {
        assert_eq!("fcm".parse::<PushProviderKind>().unwrap(), PushProviderKind::Fcm);
        assert_eq!(PushProviderKind::OneSignal.as_str(), "onesignal");
        assert!("apns".parse::<PushProviderKind>().is_err());

        let json = serde_json::to_string(&PushProviderKind::OneSignal).unwrap();
        assert_eq!(json, r#""onesignal""#);
    }

    #[test]
    fn test_batch_result_counts() {
        let mut result = BatchResult::default();
        result.record_success();
        result.record_failure("t1", "UNREGISTERED");
        assert_eq!(result.success_count, 1);
        assert_eq!(result.failure_count, 1);
        assert_eq!(result.errors[0].identifier, "t1");
    }
}
