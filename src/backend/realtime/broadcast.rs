/**
 * Per-Room Event Broadcasting
 *
 * `RoomHub` keeps one `tokio::sync::broadcast` channel per room. Connections
 * subscribe to the rooms they joined; the chat service and the gateway
 * publish into them. Channels are created on first subscription and pruned
 * by `cleanup_inactive_channels` once nobody listens.
 *
 * Emitting reaches every receiver subscribed at call time. A room without
 * receivers is not an error: the emit reports 0.
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::shared::ServerEvent;

/// Event published into a room channel
#[derive(Debug, Clone)]
pub struct RoomEvent {
    pub room_id: Uuid,
    /// Connection that produced the event, never echoed back to it
    pub origin: Option<Uuid>,
    pub frame: ServerEvent,
}

impl RoomEvent {
    /// Event produced outside any connection (e.g. an HTTP request)
    pub fn new(room_id: Uuid, frame: ServerEvent) -> Self {
        Self {
            room_id,
            origin: None,
            frame,
        }
    }

    /// Event produced by a connection
    pub fn from_connection(room_id: Uuid, connection_id: Uuid, frame: ServerEvent) -> Self {
        Self {
            room_id,
            origin: Some(connection_id),
            frame,
        }
    }
}

/// Registry of per-room broadcast channels
#[derive(Clone)]
pub struct RoomHub {
    channels: Arc<Mutex<HashMap<Uuid, broadcast::Sender<RoomEvent>>>>,
    capacity: usize,
}

impl RoomHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<Uuid, broadcast::Sender<RoomEvent>>> {
        self.channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Subscribe to a room, creating its channel if needed
    pub fn subscribe(&self, room_id: Uuid) -> broadcast::Receiver<RoomEvent> {
        let capacity = self.capacity;
        self.channels()
            .entry(room_id)
            .or_insert_with(|| broadcast::channel(capacity).0)
            .subscribe()
    }

    /// Broadcast to every current subscriber of the room.
    ///
    /// Returns the number of receivers reached.
    pub fn emit_to_room(&self, room_id: Uuid, event: RoomEvent) -> usize {
        let sender = self.channels().get(&room_id).cloned();
        let Some(sender) = sender else {
            tracing::debug!("[Realtime] No subscribers in room {}", room_id);
            return 0;
        };

        match sender.send(event) {
            Ok(count) => {
                tracing::debug!("[Realtime] Event broadcast to {} subscribers in room {}", count, room_id);
                count
            }
            Err(_) => {
                tracing::debug!("[Realtime] No subscribers in room {}", room_id);
                0
            }
        }
    }

    pub fn subscriber_count(&self, room_id: Uuid) -> usize {
        self.channels()
            .get(&room_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    pub fn channel_count(&self) -> usize {
        self.channels().len()
    }

    /// Drop channels that have no receivers left, returning how many were removed
    pub fn cleanup_inactive_channels(&self) -> usize {
        let mut channels = self.channels();
        let before = channels.len();
        channels.retain(|_, sender| sender.receiver_count() > 0);
        before - channels.len()
    }
}
