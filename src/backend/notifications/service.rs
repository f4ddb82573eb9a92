/**
 * Notification Fan-out
 *
 * Resolves recipient users to push identifiers and dispatches one payload
 * through every configured provider.
 *
 * # Guarantees
 *
 * - The excluded user (normally the sender) and duplicate recipients are
 *   removed before any lookup; an empty set performs no lookup.
 * - Excluded identifiers (the sending device) are never dispatched to.
 * - Providers run concurrently and independently. A failing provider is
 *   recorded as unavailable and does not affect the others.
 * - `notify` never returns an error. Directory failures produce an empty
 *   report carrying the failure.
 */

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;
use uuid::Uuid;

use crate::backend::directory::UserDirectory;
use crate::backend::notifications::provider::{IdentifierError, PushPayload, PushProvider, PushProviderKind};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Delivered,
    Unavailable,
}

/// Outcome for one provider
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderReport {
    pub provider: PushProviderKind,
    pub status: ProviderStatus,
    pub attempted: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub errors: Vec<IdentifierError>,
    /// Provider-level failure, when unavailable
    pub error: Option<String>,
}

/// Outcome of one `notify` call
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReport {
    /// Recipients left after exclusion and deduplication
    pub recipients: usize,
    /// Recipients unknown to the user directory
    pub unknown_users: usize,
    /// Known recipients with nothing to deliver to
    pub users_without_identifiers: usize,
    pub providers: Vec<ProviderReport>,
    pub directory_error: Option<String>,
}

impl DeliveryReport {
    pub fn success_count(&self) -> usize {
        self.providers.iter().map(|p| p.success_count).sum()
    }

    pub fn failure_count(&self) -> usize {
        self.providers.iter().map(|p| p.failure_count).sum()
    }

    pub fn provider(&self, kind: PushProviderKind) -> Option<&ProviderReport> {
        self.providers.iter().find(|p| p.provider == kind)
    }
}

#[derive(Clone)]
pub struct NotificationService {
    users: Arc<dyn UserDirectory>,
    providers: Vec<Arc<dyn PushProvider>>,
}

impl NotificationService {
    pub fn new(users: Arc<dyn UserDirectory>, providers: Vec<Arc<dyn PushProvider>>) -> Self {
        Self { users, providers }
    }

    pub fn provider_kinds(&self) -> Vec<PushProviderKind> {
        self.providers.iter().map(|p| p.kind()).collect()
    }

    /// Notify `recipients` except `exclude_user`
    pub async fn notify(&self, recipients: &[Uuid], exclude_user: Option<Uuid>, payload: &PushPayload) -> DeliveryReport {
        self.notify_excluding(recipients, exclude_user, &[], payload).await
    }

    /// Like `notify`, additionally never dispatching to `exclude_identifiers`
    pub async fn notify_excluding(
        &self,
        recipients: &[Uuid],
        exclude_user: Option<Uuid>,
        exclude_identifiers: &[String],
        payload: &PushPayload,
    ) -> DeliveryReport {
        let mut seen = HashSet::new();
        let recipients: Vec<Uuid> = recipients
            .iter()
            .copied()
            .filter(|id| Some(*id) != exclude_user && seen.insert(*id))
            .collect();

        let mut report = DeliveryReport {
            recipients: recipients.len(),
            ..DeliveryReport::default()
        };
        if recipients.is_empty() {
            return report;
        }

        let users = match self.users.find_by_ids(&recipients).await {
            Ok(users) => users,
            Err(e) => {
                tracing::warn!("[Notifications] User lookup failed, nothing sent: {}", e);
                report.directory_error = Some(e.message());
                return report;
            }
        };
        report.unknown_users = recipients.len().saturating_sub(users.len());

        let excluded: HashSet<&str> = exclude_identifiers.iter().map(String::as_str).collect();
        let configured: HashSet<PushProviderKind> = self.providers.iter().map(|p| p.kind()).collect();

        let mut targets: BTreeMap<PushProviderKind, Vec<String>> = BTreeMap::new();
        for user in &users {
            let mut reachable = false;
            for id in &user.push_identifiers {
                if excluded.contains(id.identifier.as_str()) || !configured.contains(&id.provider) {
                    continue;
                }
                reachable = true;
                let list = targets.entry(id.provider).or_default();
                if !list.contains(&id.identifier) {
                    list.push(id.identifier.clone());
                }
            }
            if !reachable {
                report.users_without_identifiers += 1;
            }
        }

        if targets.is_empty() {
            tracing::debug!("[Notifications] No push identifiers for {} recipients", recipients.len());
            return report;
        }

        let dispatches = self.providers.iter().filter_map(|provider| {
            let identifiers = targets.get(&provider.kind())?;
            Some(dispatch(provider.as_ref(), identifiers, payload))
        });
        report.providers = join_all(dispatches).await;

        tracing::info!(
            "[Notifications] Delivered to {} identifiers, {} failures",
            report.success_count(),
            report.failure_count()
        );
        report
    }
}

async fn dispatch(provider: &dyn PushProvider, identifiers: &[String], payload: &PushPayload) -> ProviderReport {
    let kind = provider.kind();
    match provider.send_batch(identifiers, payload).await {
        Ok(batch) => {
            for failure in &batch.errors {
                tracing::debug!(
                    "[Notifications] {} identifier {} failed: {}",
                    kind,
                    failure.identifier,
                    failure.error
                );
            }
            ProviderReport {
                provider: kind,
                status: ProviderStatus::Delivered,
                attempted: identifiers.len(),
                success_count: batch.success_count,
                failure_count: batch.failure_count,
                errors: batch.errors,
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!("[Notifications] Provider {} unavailable: {}", kind, e);
            ProviderReport {
                provider: kind,
                status: ProviderStatus::Unavailable,
                attempted: identifiers.len(),
                success_count: 0,
                failure_count: 0,
                errors: Vec::new(),
                error: Some(e.message()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::directory::{PushIdentifier, UserRecord};
    use crate::backend::error::{BackendError, BackendResult};
    use crate::backend::notifications::provider::BatchResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Directory {
        users: Vec<UserRecord>,
        lookups: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl UserDirectory for Directory {
        async fn find_by_ids(&self, ids: &[Uuid]) -> BackendResult<Vec<UserRecord>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(BackendError::validation("directory down"));
            }
            Ok(self.users.iter().filter(|u| ids.contains(&u.id)).cloned().collect())
        }

        async fn register_push_identifier(&self, _: Uuid, _: PushIdentifier) -> BackendResult<bool> {
            Ok(true)
        }
    }

    struct Recorder {
        kind: PushProviderKind,
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    impl Recorder {
        fn new(kind: PushProviderKind, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                kind,
                sent: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    #[async_trait]
    impl PushProvider for Recorder {
        fn kind(&self) -> PushProviderKind {
            self.kind
        }

        async fn send_batch(&self, identifiers: &[String], _: &PushPayload) -> BackendResult<BatchResult> {
            if self.fail {
                return Err(BackendError::provider(self.kind.as_str(), "unreachable"));
            }
            self.sent.lock().unwrap().extend(identifiers.iter().cloned());
            Ok(BatchResult {
                success_count: identifiers.len(),
                ..BatchResult::default()
            })
        }
    }

    fn user(fcm: &[&str], onesignal: &[&str]) -> UserRecord {
        let mut push_identifiers: Vec<PushIdentifier> = fcm
            .iter()
            .map(|t| PushIdentifier::new(PushProviderKind::Fcm, *t))
            .collect();
        push_identifiers.extend(onesignal.iter().map(|p| PushIdentifier::new(PushProviderKind::OneSignal, *p)));
        UserRecord {
            id: Uuid::new_v4(),
            username: "u".into(),
            avatar_url: String::new(),
            push_identifiers,
        }
    }

    fn directory(users: Vec<UserRecord>, fail: bool) -> Arc<Directory> {
        Arc::new(Directory {
            users,
            lookups: AtomicUsize::new(0),
            fail,
        })
    }

    #[tokio::test]
    async fn test_sender_is_never_notified() {
        let sender = user(&["sender-token"], &["sender-player"]);
        let receiver = user(&["receiver-token"], &[]);
        let (sender_id, receiver_id) = (sender.id, receiver.id);

        let fcm = Recorder::new(PushProviderKind::Fcm, false);
        let onesignal = Recorder::new(PushProviderKind::OneSignal, false);
        let service = NotificationService::new(
            directory(vec![sender, receiver], false),
            vec![fcm.clone(), onesignal.clone()],
        );

        let report = service
            .notify(&[sender_id, receiver_id, receiver_id], Some(sender_id), &PushPayload::new("t", "b"))
            .await;

        assert_eq!(report.recipients, 1);
        assert_eq!(*fcm.sent.lock().unwrap(), vec!["receiver-token".to_string()]);
        assert!(onesignal.sent.lock().unwrap().is_empty());
        assert_eq!(report.success_count(), 1);
    }

    #[test]
    fn test_provider_kinds_in_configuration_order() {
        let service = NotificationService::new(
            directory(Vec::new(), false),
            vec![
                Recorder::new(PushProviderKind::OneSignal, false),
                Recorder::new(PushProviderKind::Fcm, false),
            ],
        );
        assert_eq!(
            service.provider_kinds(),
            vec![PushProviderKind::OneSignal, PushProviderKind::Fcm]
        );
    }

    #[tokio::test]
    async fn test_empty_recipients_skip_lookup() {
        let sender = user(&["t"], &[]);
        let sender_id = sender.id;
        let dir = directory(vec![sender], false);
        let service = NotificationService::new(dir.clone(), vec![Recorder::new(PushProviderKind::Fcm, false)]);

        let report = service.notify(&[sender_id], Some(sender_id), &PushPayload::default()).await;
        assert_eq!(report.recipients, 0);
        assert_eq!(dir.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_is_isolated() {
        let receiver = user(&["token"], &["player"]);
        let id = receiver.id;
        let fcm = Recorder::new(PushProviderKind::Fcm, true);
        let onesignal = Recorder::new(PushProviderKind::OneSignal, false);
        let service = NotificationService::new(directory(vec![receiver], false), vec![fcm, onesignal.clone()]);

        let report = service.notify(&[id], None, &PushPayload::default()).await;

        let fcm_report = report.provider(PushProviderKind::Fcm).unwrap();
        assert_eq!(fcm_report.status, ProviderStatus::Unavailable);
        assert_eq!(fcm_report.success_count, 0);
        assert!(fcm_report.error.is_some());
        assert_eq!(report.provider(PushProviderKind::OneSignal).unwrap().success_count, 1);
        assert_eq!(*onesignal.sent.lock().unwrap(), vec!["player".to_string()]);
    }

    #[tokio::test]
    async fn test_users_without_identifiers_are_counted() {
        let bare = user(&[], &[]);
        let reachable = user(&["t"], &[]);
        let ids = [bare.id, reachable.id, Uuid::new_v4()];
        let service = NotificationService::new(
            directory(vec![bare, reachable], false),
            vec![Recorder::new(PushProviderKind::Fcm, false)],
        );

        let report = service.notify(&ids, None, &PushPayload::default()).await;
        assert_eq!(report.users_without_identifiers, 1);
        assert_eq!(report.unknown_users, 1);
        assert_eq!(report.success_count(), 1);
    }

    #[tokio::test]
    async fn test_directory_failure_yields_empty_report() {
        let service = NotificationService::new(
            directory(vec![], true),
            vec![Recorder::new(PushProviderKind::Fcm, false)],
        );
        let report = service.notify(&[Uuid::new_v4()], None, &PushPayload::default()).await;
        assert!(report.directory_error.is_some());
        assert!(report.providers.is_empty());
    }

    #[tokio::test]
    async fn test_excluded_identifiers_are_dropped() {
        let receiver = user(&["phone", "tablet"], &[]);
        let id = receiver.id;
        let fcm = Recorder::new(PushProviderKind::Fcm, false);
        let service = NotificationService::new(directory(vec![receiver], false), vec![fcm.clone()]);

        service
            .notify_excluding(&[id], None, &["tablet".to_string()], &PushPayload::default())
            .await;
        assert_eq!(*fcm.sent.lock().unwrap(), vec!["phone".to_string()]);
    }
}
