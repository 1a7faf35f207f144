//! Event router: protocol step from inbound events to registry actions
//!
//! Routing is a pure function of the inbound event and the sender's
//! context; the caller applies the resulting action against the room
//! registry. This keeps the protocol unit-testable without a transport.
//!
//! The router deliberately performs no authorization check and no
//! durability write for chat messages. The broadcast is a low-latency
//! notification overlay; the durable record is written through the REST
//! layer's create-message endpoint (see `history`).

use crate::auth::Identity;
use crate::protocol::{ClientEvent, ServerEvent};
use crate::rooms::RoomId;
use crate::session::SessionId;
use chrono::{SecondsFormat, Utc};

/// What the registry should do in response to one inbound event
#[derive(Debug, Clone, PartialEq)]
pub enum RouterAction {
    /// Add the sender to a room
    Join(RoomId),

    /// Remove the sender from a room
    Leave(RoomId),

    /// Fan an event out to a room, optionally excluding the sender
    Broadcast {
        room: RoomId,
        event: ServerEvent,
        exclude: Option<SessionId>,
    },
}

pub struct EventRouter;

impl EventRouter {
    /// Map one inbound client event to the action the registry applies.
    ///
    /// Every well-formed event maps to exactly one action; malformed
    /// payloads never reach this point because they fail deserialization
    /// at the transport boundary.
    pub fn route(session_id: SessionId, identity: &Identity, event: ClientEvent) -> RouterAction {
        match event {
            ClientEvent::JoinProject { project_id } => {
                RouterAction::Join(RoomId::for_project(&project_id))
            }

            ClientEvent::LeaveProject { project_id } => {
                RouterAction::Leave(RoomId::for_project(&project_id))
            }

            ClientEvent::SendMessage {
                project_id,
                content,
                is_command,
            } => RouterAction::Broadcast {
                room: RoomId::for_project(&project_id),
                event: ServerEvent::NewMessage {
                    id: ephemeral_message_id(),
                    content,
                    is_command,
                    user_id: identity.user_id.clone(),
                    username: identity.username.clone(),
                    timestamp: server_timestamp(),
                },
                // The sender receives its own message too, so every tab
                // of the same user stays consistent.
                exclude: None,
            },

            ClientEvent::TypingStart { project_id } => RouterAction::Broadcast {
                room: RoomId::for_project(&project_id),
                event: ServerEvent::UserTyping {
                    user_id: identity.user_id.clone(),
                    username: identity.username.clone(),
                },
                exclude: Some(session_id),
            },

            ClientEvent::TypingStop { project_id } => RouterAction::Broadcast {
                room: RoomId::for_project(&project_id),
                event: ServerEvent::UserStoppedTyping {
                    user_id: identity.user_id.clone(),
                },
                exclude: Some(session_id),
            },

            ClientEvent::ContributionRequest {
                project_id,
                contributor_id,
                contributor_name,
            } => RouterAction::Broadcast {
                room: RoomId::for_project(&project_id),
                event: ServerEvent::ContributionRequested {
                    contributor_id,
                    contributor_name,
                    timestamp: server_timestamp(),
                },
                exclude: None,
            },

            ClientEvent::ProjectUpdate {
                project_id,
                update_type,
                message,
            } => RouterAction::Broadcast {
                room: RoomId::for_project(&project_id),
                event: ServerEvent::ProjectUpdated {
                    update_type,
                    message,
                    timestamp: server_timestamp(),
                },
                exclude: Some(session_id),
            },
        }
    }
}

/// Wall-clock id stamped on broadcast messages.
///
/// Not the durable store's id: clients dedup the live copy against the
/// REST-confirmed copy by (sender, content, timestamp), not by id.
fn ephemeral_message_id() -> String {
    Utc::now().timestamp_millis().to_string()
}

fn server_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
