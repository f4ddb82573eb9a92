/**
 * Gateway Session
 *
 * State of one authenticated connection: the rooms it listens to and its
 * presence registration.
 *
 * Joined rooms are kept in a `StreamMap` keyed by room id, so leaving a room
 * (or dropping the session) drops its receiver immediately. Events published
 * by this connection itself (typing) are never handed back to it.
 *
 * The session owns a `PresenceGuard`: the user's connection count goes back
 * down when the session is dropped, however the connection ended.
 */

use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{StreamExt, StreamMap};
use uuid::Uuid;

use crate::backend::auth::Identity;
use crate::backend::realtime::{PresenceChange, PresenceGuard, PresenceTracker, RoomEvent, RoomHub};
use crate::shared::{ClientEvent, ServerEvent};

pub struct GatewaySession {
    connection_id: Uuid,
    identity: Identity,
    hub: RoomHub,
    rooms: StreamMap<Uuid, BroadcastStream<RoomEvent>>,
    presence_updates: BroadcastStream<PresenceChange>,
    _presence: PresenceGuard,
}

impl GatewaySession {
    /// Register the connection as online and start listening for presence changes
    pub fn new(identity: Identity, hub: RoomHub, presence: &PresenceTracker) -> Self {
        let guard = presence.connect(identity.user_id);
        let presence_updates = BroadcastStream::new(presence.subscribe());

        let connection_id = Uuid::new_v4();
        tracing::debug!("[Gateway] Connection {} opened for user {}", connection_id, identity.user_id);

        Self {
            connection_id,
            identity,
            hub,
            rooms: StreamMap::new(),
            presence_updates,
            _presence: guard,
        }
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn is_joined(&self, room_id: Uuid) -> bool {
        self.rooms.contains_key(&room_id)
    }

    pub fn joined_rooms(&self) -> Vec<Uuid> {
        self.rooms.keys().copied().collect()
    }

    /// Subscribe to a room; joining twice keeps a single subscription
    pub fn join(&mut self, room_id: Uuid) -> ServerEvent {
        if !self.is_joined(room_id) {
            self.rooms
                .insert(room_id, BroadcastStream::new(self.hub.subscribe(room_id)));
            tracing::debug!("[Gateway] {} joined room {}", self.connection_id, room_id);
        }
        ServerEvent::Joined { room_id }
    }

    pub fn leave(&mut self, room_id: Uuid) -> ServerEvent {
        if self.rooms.remove(&room_id).is_some() {
            tracing::debug!("[Gateway] {} left room {}", self.connection_id, room_id);
        }
        ServerEvent::Left { room_id }
    }

    /// Relay a typing indicator to the room's other connections.
    /// Returns how many connections received it.
    pub fn typing(&self, room_id: Uuid, is_typing: bool) -> usize {
        let frame = ServerEvent::Typing {
            room_id,
            user_id: self.identity.user_id,
            username: self.identity.display_name.clone(),
            is_typing,
        };
        self.hub
            .emit_to_room(room_id, RoomEvent::from_connection(room_id, self.connection_id, frame))
    }

    /// Apply a client frame, returning the reply to send back, if any
    pub fn handle(&mut self, event: ClientEvent) -> Option<ServerEvent> {
        match event {
            ClientEvent::Auth { .. } => Some(ServerEvent::error("Already authenticated")),
            ClientEvent::JoinRoom { room_id } => Some(self.join(room_id)),
            ClientEvent::LeaveRoom { room_id } => Some(self.leave(room_id)),
            ClientEvent::Typing { room_id, is_typing } => {
                self.typing(room_id, is_typing);
                None
            }
        }
    }

    /// Next frame to push to the client: a room event or a presence change.
    ///
    /// Returns `None` once the presence channel is closed.
    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        let own = self.connection_id;
        loop {
            tokio::select! {
                Some((room_id, item)) = self.rooms.next(), if !self.rooms.is_empty() => match item {
                    Ok(event) if event.origin == Some(own) => continue,
                    Ok(event) => return Some(event.frame),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        tracing::warn!("[Gateway] {} lagged {} events in room {}", own, skipped, room_id);
                    }
                },
                item = self.presence_updates.next() => match item {
                    Some(Ok(change)) => {
                        return Some(ServerEvent::PresenceUpdate {
                            user_id: change.user_id,
                            online: change.online,
                        })
                    }
                    Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                        tracing::warn!("[Gateway] {} lagged {} presence updates", own, skipped);
                    }
                    None => return None,
                },
            }
        }
    }
}

impl Drop for GatewaySession {
    fn drop(&mut self) {
        tracing::debug!(
            "[Gateway] Connection {} closed, leaving {} rooms",
            self.connection_id,
            self.rooms.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::time::Duration;
    use tokio::time::timeout;

    fn identity(name: &str) -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            display_name: name.into(),
            avatar_url: String::new(),
        }
    }

    async fn next(session: &mut GatewaySession) -> Option<ServerEvent> {
        timeout(Duration::from_millis(200), session.next_event()).await.ok().flatten()
    }

    #[tokio::test]
    async fn test_join_is_idempotent_and_leave_drops_receiver() {
        let hub = RoomHub::new(8);
        let presence = PresenceTracker::new(8);
        let alice = identity("alice");
        let mut session = GatewaySession::new(alice.clone(), hub.clone(), &presence);
        assert_eq!(session.identity(), &alice);
        assert!(presence.is_online(alice.user_id));
        let room = Uuid::new_v4();

        session.join(room);
        session.join(room);
        assert_eq!(hub.subscriber_count(room), 1);
        assert_eq!(session.joined_rooms(), vec![room]);

        assert_eq!(session.leave(room), ServerEvent::Left { room_id: room });
        assert_eq!(hub.subscriber_count(room), 0);
    }

    #[tokio::test]
    async fn test_typing_is_not_echoed() {
        let hub = RoomHub::new(8);
        let presence = PresenceTracker::new(8);
        let mut alice = GatewaySession::new(identity("alice"), hub.clone(), &presence);
        let mut bob = GatewaySession::new(identity("bob"), hub.clone(), &presence);
        let room = Uuid::new_v4();
        alice.join(room);
        bob.join(room);

        // Drain presence updates from connecting
        while let Some(ServerEvent::PresenceUpdate { .. }) = next(&mut alice).await {}
        while let Some(ServerEvent::PresenceUpdate { .. }) = next(&mut bob).await {}

        assert_eq!(alice.handle(ClientEvent::Typing { room_id: room, is_typing: true }), None);

        assert_matches!(
            next(&mut bob).await,
            Some(ServerEvent::Typing { username, is_typing: true, .. }) if username == "alice"
        );
        assert_eq!(next(&mut alice).await, None);
    }

    #[tokio::test]
    async fn test_presence_follows_session_lifetime() {
        let hub = RoomHub::new(8);
        let presence = PresenceTracker::new(8);
        let alice = identity("alice");

        let first = GatewaySession::new(alice.clone(), hub.clone(), &presence);
        let second = GatewaySession::new(alice.clone(), hub.clone(), &presence);
        assert_eq!(presence.connection_count(alice.user_id), 2);

        drop(first);
        assert!(presence.is_online(alice.user_id));
        drop(second);
        assert!(!presence.is_online(alice.user_id));
    }

    #[tokio::test]
    async fn test_presence_updates_are_relayed() {
        let hub = RoomHub::new(8);
        let presence = PresenceTracker::new(8);
        let mut watcher = GatewaySession::new(identity("watcher"), hub.clone(), &presence);

        let carol = identity("carol");
        let session = GatewaySession::new(carol.clone(), hub, &presence);
        assert_eq!(
            next(&mut watcher).await,
            Some(ServerEvent::PresenceUpdate { user_id: carol.user_id, online: true })
        );

        drop(session);
        assert_eq!(
            next(&mut watcher).await,
            Some(ServerEvent::PresenceUpdate { user_id: carol.user_id, online: false })
        );
    }

    #[tokio::test]
    async fn test_second_auth_frame_is_an_error() {
        let presence = PresenceTracker::new(8);
        let mut session = GatewaySession::new(identity("alice"), RoomHub::new(8), &presence);
        assert_matches!(
            session.handle(ClientEvent::Auth { token: "t".into() }),
            Some(ServerEvent::Error { .. })
        );
    }
}
