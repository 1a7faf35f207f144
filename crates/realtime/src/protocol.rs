//! Wire protocol for the collaboration websocket
//!
//! Each event is a tagged JSON object; the `type` tag selects the variant
//! and the remaining fields are its payload. Unknown tags and payloads
//! missing required fields fail deserialization and are dropped at the
//! transport boundary, never answered.

use serde::{Deserialize, Serialize};

/// Inbound events a client may send after the handshake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "join-project", rename_all = "camelCase")]
    JoinProject { project_id: String },

    #[serde(rename = "leave-project", rename_all = "camelCase")]
    LeaveProject { project_id: String },

    #[serde(rename = "send-message", rename_all = "camelCase")]
    SendMessage {
        project_id: String,
        content: String,
        #[serde(default)]
        is_command: bool,
    },

    #[serde(rename = "typing-start", rename_all = "camelCase")]
    TypingStart { project_id: String },

    #[serde(rename = "typing-stop", rename_all = "camelCase")]
    TypingStop { project_id: String },

    #[serde(rename = "contribution-request", rename_all = "camelCase")]
    ContributionRequest {
        project_id: String,
        contributor_id: String,
        contributor_name: String,
    },

    #[serde(rename = "project-update", rename_all = "camelCase")]
    ProjectUpdate {
        project_id: String,
        update_type: String,
        message: String,
    },
}

/// Outbound events broadcast to room members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "new-message", rename_all = "camelCase")]
    NewMessage {
        /// Ephemeral wall-clock id, not the durable store's id
        id: String,
        content: String,
        is_command: bool,
        user_id: String,
        username: String,
        timestamp: String,
    },

    #[serde(rename = "user-typing", rename_all = "camelCase")]
    UserTyping { user_id: String, username: String },

    #[serde(rename = "user-stopped-typing", rename_all = "camelCase")]
    UserStoppedTyping { user_id: String },

    #[serde(rename = "contribution-requested", rename_all = "camelCase")]
    ContributionRequested {
        contributor_id: String,
        contributor_name: String,
        timestamp: String,
    },

    #[serde(rename = "project-updated", rename_all = "camelCase")]
    ProjectUpdated {
        update_type: String,
        message: String,
        timestamp: String,
    },
}

impl ServerEvent {
    /// Serialize to JSON text for websocket transmission
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
