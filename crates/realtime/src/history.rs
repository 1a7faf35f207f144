//! Durable chat history bridge
//!
//! The realtime layer never persists what it broadcasts. The authoritative
//! chat log lives behind the REST API, which also owns authorization
//! (project membership, command-sender-must-be-author). This module is
//! the narrow contract through which that log is consumed: a paged read
//! used to hydrate history on load, and the durable write a client calls
//! alongside its live `send-message` event.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One persisted chat message as the durable store records it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    /// The durable store's id, distinct from the ephemeral broadcast id
    pub id: String,
    pub project_id: String,
    pub user_id: String,
    pub username: String,
    pub content: String,
    pub is_command: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u32,
}

/// One page of the durable log, oldest-first
#[derive(Debug, Clone)]
pub struct MessagePage {
    pub messages: Vec<StoredMessage>,
    pub pagination: Pagination,
}

/// Contract with the durable chat-message store.
///
/// The caller's bearer token rides along on every call because the REST
/// layer enforces authorization there, not here.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Fetch one page of history for a project, oldest-first
    async fn get_messages(
        &self,
        token: &str,
        project_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<MessagePage>;

    /// Write a message to the durable log
    async fn create_message(
        &self,
        token: &str,
        project_id: &str,
        content: &str,
        is_command: bool,
    ) -> Result<StoredMessage>;
}

/// REST-backed implementation calling the platform API
pub struct RestMessageStore {
    client: reqwest::Client,
    base_url: String,
}

impl RestMessageStore {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn messages_url(&self, project_id: &str) -> String {
        format!("{}/api/projects/{}/chat/messages", self.base_url, project_id)
    }
}

/// Standard REST envelope: `{ success, data: ... }`
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct MessagesData {
    messages: Vec<StoredMessage>,
    pagination: Pagination,
}

#[derive(Debug, Deserialize)]
struct MessageData {
    message: StoredMessage,
}

#[async_trait]
impl MessageStore for RestMessageStore {
    async fn get_messages(
        &self,
        token: &str,
        project_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<MessagePage> {
        let response = self
            .client
            .get(self.messages_url(project_id))
            .bearer_auth(token)
            .query(&[("page", page), ("limit", limit)])
            .send()
            .await
            .context("Failed to fetch chat history")?
            .error_for_status()
            .context("Chat history request rejected")?;

        let envelope: ApiEnvelope<MessagesData> = response
            .json()
            .await
            .context("Malformed chat history response")?;

        Ok(MessagePage {
            messages: envelope.data.messages,
            pagination: envelope.data.pagination,
        })
    }

    async fn create_message(
        &self,
        token: &str,
        project_id: &str,
        content: &str,
        is_command: bool,
    ) -> Result<StoredMessage> {
        let response = self
            .client
            .post(self.messages_url(project_id))
            .bearer_auth(token)
            .json(&serde_json::json!({
                "content": content,
                "isCommand": is_command,
            }))
            .send()
            .await
            .context("Failed to persist chat message")?
            .error_for_status()
            .context("Chat message rejected by the durable store")?;

        let envelope: ApiEnvelope<MessageData> = response
            .json()
            .await
            .context("Malformed create-message response")?;

        Ok(envelope.data.message)
    }
}

/// In-memory store for tests.
///
/// The bearer token is used verbatim as the caller's user id and
/// username; there is no token verification in this double.
pub struct InMemoryMessageStore {
    messages: parking_lot::RwLock<Vec<StoredMessage>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self {
            messages: parking_lot::RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn get_messages(
        &self,
        _token: &str,
        project_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<MessagePage> {
        let messages = self.messages.read();

        let mut project_messages: Vec<StoredMessage> = messages
            .iter()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect();

        // Newest-first for paging, then reversed so each page reads
        // oldest-first, matching the REST layer
        project_messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = project_messages.len() as u64;
        let skip = (page.saturating_sub(1) as usize) * limit as usize;
        let mut page_messages: Vec<StoredMessage> = project_messages
            .into_iter()
            .skip(skip)
            .take(limit as usize)
            .collect();
        page_messages.reverse();

        let pages = if limit == 0 {
            0
        } else {
            total.div_ceil(limit as u64) as u32
        };

        Ok(MessagePage {
            messages: page_messages,
            pagination: Pagination {
                page,
                limit,
                total,
                pages,
            },
        })
    }

    async fn create_message(
        &self,
        token: &str,
        project_id: &str,
        content: &str,
        is_command: bool,
    ) -> Result<StoredMessage> {
        let message = StoredMessage {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            user_id: token.to_string(),
            username: token.to_string(),
            content: content.to_string(),
            is_command,
            created_at: Utc::now(),
        };

        self.messages.write().push(message.clone());
        Ok(message)
    }
}
