//! Connection session lifecycle
//!
//! One `Session` exists per live websocket connection. It carries the
//! identity established at handshake time and tracks which project rooms
//! the connection has joined. The room registry remains the authority for
//! delivery; the session's room set is its own view, drained atomically
//! when the connection closes.

use crate::auth::Identity;
use crate::rooms::RoomId;
use std::collections::HashSet;
use uuid::Uuid;

/// Unique identifier for a websocket session, transport-assigned
pub type SessionId = Uuid;

/// Lifecycle states for a connection session.
///
/// Transitions are one-directional except the join/leave cycle between
/// `Authenticated` and `Active`, which may repeat any number of times.
/// `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport handshake in progress
    Connecting,
    /// Identity attached, registered in the connection table
    Authenticated,
    /// Joined to at least one room
    Active,
    /// Disconnected; no further events accepted or delivered
    Closed,
}

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    identity: Identity,
    state: SessionState,
    rooms: HashSet<RoomId>,
}

impl Session {
    /// Create a session for a freshly authenticated connection
    pub fn new(identity: Identity) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity,
            state: SessionState::Connecting,
            rooms: HashSet::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn rooms(&self) -> &HashSet<RoomId> {
        &self.rooms
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Mark the handshake complete and the session registered
    pub fn authenticate(&mut self) {
        if self.state == SessionState::Connecting {
            self.state = SessionState::Authenticated;
        }
    }

    /// Record a room join. Idempotent; returns false once closed.
    pub fn note_join(&mut self, room: RoomId) -> bool {
        if self.is_closed() {
            return false;
        }

        self.rooms.insert(room);
        self.state = SessionState::Active;
        true
    }

    /// Record a room leave. Leaving the last room drops the session back
    /// to `Authenticated`; it may re-enter `Active` on a later join.
    pub fn note_leave(&mut self, room: &RoomId) -> bool {
        if self.is_closed() {
            return false;
        }

        self.rooms.remove(room);
        if self.rooms.is_empty() && self.state == SessionState::Active {
            self.state = SessionState::Authenticated;
        }
        true
    }

    /// Enter the terminal state, draining every joined room
    pub fn close(&mut self) -> Vec<RoomId> {
        self.state = SessionState::Closed;
        self.rooms.drain().collect()
    }
}
