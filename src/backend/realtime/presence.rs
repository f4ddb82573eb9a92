/**
 * Presence Tracking
 *
 * Counts open connections per user. A user is online while the count is
 * above zero. Only the 0 → 1 and 1 → 0 transitions are announced on the
 * tracker's broadcast channel; the announcement is sent while the count lock
 * is held so listeners observe transitions in the order they happened.
 *
 * Connections hold a `PresenceGuard`, which decrements on drop, so every
 * increment is paired with exactly one decrement even when a connection task
 * ends by error or cancellation.
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;
use uuid::Uuid;

/// A user came online or went offline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceChange {
    pub user_id: Uuid,
    pub online: bool,
}

struct PresenceInner {
    counts: Mutex<HashMap<Uuid, usize>>,
    changes: broadcast::Sender<PresenceChange>,
}

/// Per-process presence map
#[derive(Clone)]
pub struct PresenceTracker {
    inner: Arc<PresenceInner>,
}

impl PresenceTracker {
    pub fn new(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(PresenceInner {
                counts: Mutex::new(HashMap::new()),
                changes,
            }),
        }
    }

    fn counts(&self) -> MutexGuard<'_, HashMap<Uuid, usize>> {
        self.inner
            .counts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a new connection for `user_id`, returning the new count
    pub fn increment(&self, user_id: Uuid) -> usize {
        let mut counts = self.counts();
        let count = counts.entry(user_id).or_insert(0);
        *count += 1;
        let count = *count;
        if count == 1 {
            tracing::debug!("[Realtime] user {} is online", user_id);
            let _ = self.inner.changes.send(PresenceChange { user_id, online: true });
        }
        count
    }

    /// Record a closed connection for `user_id`, returning the new count.
    ///
    /// Unknown users are left untouched.
    pub fn decrement(&self, user_id: Uuid) -> usize {
        let mut counts = self.counts();
        let Some(count) = counts.get_mut(&user_id) else {
            return 0;
        };
        *count = count.saturating_sub(1);
        let count = *count;
        if count == 0 {
            counts.remove(&user_id);
            tracing::debug!("[Realtime] user {} is offline", user_id);
            let _ = self.inner.changes.send(PresenceChange { user_id, online: false });
        }
        count
    }

    /// Increment and return a guard that decrements when dropped
    pub fn connect(&self, user_id: Uuid) -> PresenceGuard {
        self.increment(user_id);
        PresenceGuard {
            tracker: self.clone(),
            user_id,
        }
    }

    pub fn is_online(&self, user_id: Uuid) -> bool {
        self.connection_count(user_id) > 0
    }

    pub fn connection_count(&self, user_id: Uuid) -> usize {
        self.counts().get(&user_id).copied().unwrap_or(0)
    }

    pub fn online_users(&self) -> Vec<Uuid> {
        self.counts().keys().copied().collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PresenceChange> {
        self.inner.changes.subscribe()
    }
}

/// Keeps a user's connection counted for as long as it lives
pub struct PresenceGuard {
    tracker: PresenceTracker,
    user_id: Uuid,
}

impl PresenceGuard {
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }
}

impl Drop for PresenceGuard {
    fn drop(&mut self) {
        self.tracker.decrement(self.user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_two_connections_one_event_per_crossing() {
        let tracker = PresenceTracker::new(16);
        let mut changes = tracker.subscribe();
        let user = Uuid::new_v4();

        assert_eq!(tracker.increment(user), 1);
        assert_eq!(tracker.increment(user), 2);
        assert_eq!(changes.try_recv().unwrap(), PresenceChange { user_id: user, online: true });
        assert!(matches!(changes.try_recv(), Err(TryRecvError::Empty)));

        assert_eq!(tracker.decrement(user), 1);
        assert!(tracker.is_online(user));
        assert!(matches!(changes.try_recv(), Err(TryRecvError::Empty)));

        assert_eq!(tracker.decrement(user), 0);
        assert!(!tracker.is_online(user));
        assert_eq!(changes.try_recv().unwrap(), PresenceChange { user_id: user, online: false });
    }

    #[test]
    fn test_decrement_unknown_user_is_noop() {
        let tracker = PresenceTracker::new(16);
        let mut changes = tracker.subscribe();
        assert_eq!(tracker.decrement(Uuid::new_v4()), 0);
        assert!(matches!(changes.try_recv(), Err(TryRecvError::Empty)));
        assert!(tracker.online_users().is_empty());
    }

    #[test]
    fn test_guard_decrements_on_drop() {
        let tracker = PresenceTracker::new(16);
        let user = Uuid::new_v4();
        let guard = tracker.connect(user);
        assert_eq!(guard.user_id(), user);
        assert_eq!(tracker.connection_count(user), 1);
        drop(guard);
        assert_eq!(tracker.connection_count(user), 0);
    }

    #[tokio::test]
    async fn test_concurrent_connects_balance_out() {
        let tracker = PresenceTracker::new(1024);
        let user = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let tracker = tracker.clone();
            handles.push(tokio::spawn(async move {
                let guard = tracker.connect(user);
                tokio::task::yield_now().await;
                drop(guard);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert!(!tracker.is_online(user));
    }
}
