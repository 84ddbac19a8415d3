// ABOUTME: Capabilities injected into the orchestrator: message persistence and notifications.
// ABOUTME: Keeps the reply pipeline testable without a database or a real notification queue.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use guide_agent::Citation;
use serde::{Deserialize, Serialize};

/// A message about to be persisted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewMessage {
    pub conversation_id: String,
    /// User id of the author, or the guide's sender name for replies
    pub sender: String,
    pub body: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    pub created_at: DateTime<Utc>,
}

impl NewMessage {
    pub fn new(
        conversation_id: impl Into<String>,
        sender: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            sender: sender.into(),
            body: body.into(),
            citations: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = citations;
        self
    }
}

/// A message as read back from the store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredMessage {
    pub id: i64,
    pub conversation_id: String,
    pub sender: String,
    pub body: String,
    pub citations: Vec<Citation>,
    pub created_at: DateTime<Utc>,
}

/// Job asking the notification worker to tell a user about a new reply
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationJob {
    pub conversation_id: String,
    pub message_id: i64,
    pub recipient: String,
    /// Short excerpt of the reply
    pub preview: String,
}

/// Persists conversation messages
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Save a message, returning its id
    async fn save_message(&self, message: &NewMessage) -> Result<i64>;

    /// Most recent messages of a conversation, oldest first
    async fn conversation(&self, conversation_id: &str, limit: usize) -> Result<Vec<StoredMessage>>;
}

/// Accepts notification jobs for asynchronous delivery
#[async_trait]
pub trait NotificationQueue: Send + Sync {
    async fn enqueue(&self, job: NotificationJob) -> Result<()>;
}
