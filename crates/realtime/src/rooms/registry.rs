/// Room registry mapping project rooms to connected sessions
///
/// The one piece of shared, process-wide mutable state in the realtime
/// layer. All membership mutation goes through this type; no other
/// component touches the tables directly. The registry is an explicit
/// object owned by the server process and passed by reference, never a
/// hidden singleton.
use actix::{Message as ActixMessage, Recipient};
use dashmap::DashMap;
use std::collections::HashSet;
use std::fmt;

use crate::auth::Identity;
use crate::protocol::ServerEvent;
use crate::session::SessionId;

/// Identifier for a project's live collaboration room.
///
/// Derived deterministically from the project id; rooms are computed, not
/// stored, and never reused for a different project.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomId(String);

impl RoomId {
    pub fn for_project(project_id: &str) -> Self {
        Self(format!("project-{}", project_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serialized frame pushed to a connected client
#[derive(Debug, Clone, ActixMessage)]
#[rtype(result = "()")]
pub struct OutboundFrame(pub String);

/// Delivery handle plus identity for one live connection
#[derive(Clone)]
struct ConnectionInfo {
    identity: Identity,
    recipient: Recipient<OutboundFrame>,
}

#[derive(Default)]
struct RegistryMetrics {
    events_delivered: parking_lot::RwLock<usize>,
}

/// Registry of live connections and their room memberships
pub struct RoomRegistry {
    /// Map: session_id -> connection info
    connections: DashMap<SessionId, ConnectionInfo>,

    /// Map: room_id -> member session ids. Rooms exist exactly while
    /// they have members.
    rooms: DashMap<RoomId, HashSet<SessionId>>,

    metrics: RegistryMetrics,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            rooms: DashMap::new(),
            metrics: RegistryMetrics::default(),
        }
    }

    /// Register a connection in the process-wide connection table
    pub fn register(
        &self,
        session_id: SessionId,
        identity: Identity,
        recipient: Recipient<OutboundFrame>,
    ) {
        tracing::info!("User connected: {} ({})", session_id, identity.user_id);

        self.connections.insert(
            session_id,
            ConnectionInfo {
                identity,
                recipient,
            },
        );
    }

    /// Remove a connection from the connection table.
    ///
    /// Callers must remove room memberships first via
    /// `remove_session_from_all_rooms`.
    pub fn unregister(&self, session_id: SessionId) {
        if let Some((_, info)) = self.connections.remove(&session_id) {
            tracing::info!("User disconnected: {} ({})", session_id, info.identity.user_id);
        }
    }

    /// Add a session to a room. Idempotent; the room begins existing on
    /// first join. A no-op for sessions not in the connection table.
    pub fn join(&self, session_id: SessionId, room: RoomId) {
        if !self.connections.contains_key(&session_id) {
            tracing::warn!("Ignoring join from unregistered session {}", session_id);
            return;
        }

        let inserted = self.rooms.entry(room.clone()).or_default().insert(session_id);
        if inserted {
            tracing::info!("Session {} joined {}", session_id, room);
        }
    }

    /// Remove a session from a room. Idempotent; the room ceases to exist
    /// when its last member leaves. A no-op against a nonexistent room.
    pub fn leave(&self, session_id: SessionId, room: &RoomId) {
        if let Some(mut members) = self.rooms.get_mut(room) {
            if members.remove(&session_id) {
                tracing::info!("Session {} left {}", session_id, room);
            }
        }
        self.rooms.remove_if(room, |_, members| members.is_empty());
    }

    /// Deliver an event to every current member of a room, except the
    /// optionally excluded sender.
    ///
    /// Best-effort: a member that disconnected mid-broadcast simply does
    /// not receive the event, and no error reaches the broadcaster.
    /// Broadcasting to a nonexistent room delivers to zero recipients.
    pub fn broadcast(
        &self,
        room: &RoomId,
        event: &ServerEvent,
        exclude: Option<SessionId>,
    ) -> Result<usize, BroadcastError> {
        let members: Vec<SessionId> = match self.rooms.get(room) {
            Some(members) => members.iter().copied().collect(),
            None => return Ok(0),
        };

        let json = event
            .to_json()
            .map_err(|e| BroadcastError::Serialization(e.to_string()))?;

        let mut sent_count = 0;

        for session_id in members {
            if Some(session_id) == exclude {
                continue;
            }

            // Skip members whose connection is already gone
            if let Some(conn) = self.connections.get(&session_id) {
                conn.recipient.do_send(OutboundFrame(json.clone()));
                sent_count += 1;
            }
        }

        *self.metrics.events_delivered.write() += sent_count;

        tracing::debug!("Broadcast to {} members of {}", sent_count, room);

        Ok(sent_count)
    }

    /// Remove a session from every room it belongs to. Called exactly
    /// once, at disconnect, so no dangling membership survives the
    /// connection.
    pub fn remove_session_from_all_rooms(&self, session_id: SessionId) {
        self.rooms.retain(|_, members| {
            members.remove(&session_id);
            !members.is_empty()
        });
    }

    pub fn is_member(&self, session_id: SessionId, room: &RoomId) -> bool {
        self.rooms
            .get(room)
            .map(|members| members.contains(&session_id))
            .unwrap_or(false)
    }

    pub fn room_size(&self, room: &RoomId) -> usize {
        self.rooms.get(room).map(|members| members.len()).unwrap_or(0)
    }

    /// Number of live connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of rooms with at least one member
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Total events delivered across all broadcasts
    pub fn events_delivered(&self) -> usize {
        *self.metrics.events_delivered.read()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Broadcast errors
#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix::{Actor, Context as ActixContext, Handler};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;
    use uuid::Uuid;

    /// Records every frame delivered to it
    struct Recorder {
        frames: Arc<Mutex<Vec<String>>>,
    }

    impl Actor for Recorder {
        type Context = ActixContext<Self>;
    }

    impl Handler<OutboundFrame> for Recorder {
        type Result = ();

        fn handle(&mut self, msg: OutboundFrame, _ctx: &mut Self::Context) {
            self.frames.lock().push(msg.0);
        }
    }

    fn test_identity(user_id: &str) -> Identity {
        Identity {
            user_id: user_id.to_string(),
            username: user_id.to_string(),
        }
    }

    fn connect(registry: &RoomRegistry, user_id: &str) -> (SessionId, Arc<Mutex<Vec<String>>>) {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let addr = Recorder {
            frames: frames.clone(),
        }
        .start();

        let session_id = Uuid::new_v4();
        registry.register(session_id, test_identity(user_id), addr.recipient());
        (session_id, frames)
    }

    fn typing_event(user_id: &str) -> ServerEvent {
        ServerEvent::UserTyping {
            user_id: user_id.to_string(),
            username: user_id.to_string(),
        }
    }

    async fn drain_mailboxes() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[actix_rt::test]
    async fn test_join_and_leave_membership() {
        let registry = RoomRegistry::new();
        let (session, _) = connect(&registry, "user-1");
        let room = RoomId::for_project("1");

        registry.join(session, room.clone());
        assert!(registry.is_member(session, &room));

        registry.leave(session, &room);
        assert!(!registry.is_member(session, &room));
        assert_eq!(registry.room_count(), 0);
    }

    #[actix_rt::test]
    async fn test_join_and_leave_are_idempotent() {
        let registry = RoomRegistry::new();
        let (session, _) = connect(&registry, "user-1");
        let room = RoomId::for_project("1");

        registry.join(session, room.clone());
        registry.join(session, room.clone());
        assert_eq!(registry.room_size(&room), 1);

        registry.leave(session, &room);
        registry.leave(session, &room);
        assert_eq!(registry.room_size(&room), 0);
    }

    #[actix_rt::test]
    async fn test_join_from_unregistered_session_is_noop() {
        let registry = RoomRegistry::new();
        let room = RoomId::for_project("1");

        registry.join(Uuid::new_v4(), room.clone());
        assert_eq!(registry.room_count(), 0);
    }

    #[actix_rt::test]
    async fn test_broadcast_reaches_all_members() {
        let registry = RoomRegistry::new();
        let (a, frames_a) = connect(&registry, "user-a");
        let (b, frames_b) = connect(&registry, "user-b");
        let room = RoomId::for_project("42");

        registry.join(a, room.clone());
        registry.join(b, room.clone());

        let sent = registry.broadcast(&room, &typing_event("user-a"), None).unwrap();
        assert_eq!(sent, 2);

        drain_mailboxes().await;
        assert_eq!(frames_a.lock().len(), 1);
        assert_eq!(frames_b.lock().len(), 1);
    }

    #[actix_rt::test]
    async fn test_broadcast_excludes_sender() {
        let registry = RoomRegistry::new();
        let (a, frames_a) = connect(&registry, "user-a");
        let (b, frames_b) = connect(&registry, "user-b");
        let room = RoomId::for_project("42");

        registry.join(a, room.clone());
        registry.join(b, room.clone());

        let sent = registry
            .broadcast(&room, &typing_event("user-a"), Some(a))
            .unwrap();
        assert_eq!(sent, 1);

        drain_mailboxes().await;
        assert!(frames_a.lock().is_empty());
        assert_eq!(frames_b.lock().len(), 1);
    }

    #[actix_rt::test]
    async fn test_broadcast_to_nonexistent_room_is_noop() {
        let registry = RoomRegistry::new();
        let room = RoomId::for_project("missing");

        let sent = registry.broadcast(&room, &typing_event("user-a"), None).unwrap();
        assert_eq!(sent, 0);
    }

    #[actix_rt::test]
    async fn test_remove_session_from_all_rooms() {
        let registry = RoomRegistry::new();
        let (a, _) = connect(&registry, "user-a");
        let (b, _) = connect(&registry, "user-b");

        let room1 = RoomId::for_project("1");
        let room2 = RoomId::for_project("2");
        registry.join(a, room1.clone());
        registry.join(a, room2.clone());
        registry.join(b, room1.clone());

        registry.remove_session_from_all_rooms(a);

        assert!(!registry.is_member(a, &room1));
        assert!(!registry.is_member(a, &room2));
        assert!(registry.is_member(b, &room1));
        // room2 had no other members and ceases to exist
        assert_eq!(registry.room_count(), 1);
    }

    #[actix_rt::test]
    async fn test_disconnected_member_is_skipped() {
        let registry = RoomRegistry::new();
        let (a, _) = connect(&registry, "user-a");
        let (b, frames_b) = connect(&registry, "user-b");
        let room = RoomId::for_project("1");

        registry.join(a, room.clone());
        registry.join(b, room.clone());

        // a's connection is gone but its membership is not yet cleaned up
        registry.unregister(a);

        let sent = registry.broadcast(&room, &typing_event("user-b"), None).unwrap();
        assert_eq!(sent, 1);

        drain_mailboxes().await;
        assert_eq!(frames_b.lock().len(), 1);
    }

    #[actix_rt::test]
    async fn test_delivery_counter() {
        let registry = RoomRegistry::new();
        let (a, _) = connect(&registry, "user-a");
        let (b, _) = connect(&registry, "user-b");
        let room = RoomId::for_project("1");

        registry.join(a, room.clone());
        registry.join(b, room.clone());

        registry.broadcast(&room, &typing_event("user-a"), None).unwrap();
        registry.broadcast(&room, &typing_event("user-a"), Some(a)).unwrap();

        assert_eq!(registry.events_delivered(), 3);
    }

    #[test]
    fn test_room_id_derivation() {
        let room = RoomId::for_project("42");
        assert_eq!(room.as_str(), "project-42");
        assert_eq!(room, RoomId::for_project("42"));
        assert_ne!(room, RoomId::for_project("43"));
    }
}
