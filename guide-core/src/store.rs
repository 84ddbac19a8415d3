// ABOUTME: SQLite-backed message store for guide conversations.
// ABOUTME: Persists user messages and guide replies with their citations as JSON.

use crate::traits::{MessageStore, NewMessage, StoredMessage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct SqliteMessageStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteMessageStore {
    /// Open (or create) the database file, creating parent directories as needed
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Connection::open(db_path).context("Failed to open SQLite database")?;
        let store = Self::with_connection(conn)?;

        tracing::info!(db = %db_path.display(), "Message store initialized");
        Ok(store)
    }

    /// In-memory store, for tests and one-shot CLI runs
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id TEXT NOT NULL,
                sender TEXT NOT NULL,
                body TEXT NOT NULL,
                citations TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages (conversation_id, id)",
            [],
        )?;

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert a message and return its id
    pub fn insert(&self, message: &NewMessage) -> Result<i64> {
        let citations = serde_json::to_string(&message.citations)?;
        let db = self
            .db
            .lock()
            .map_err(|e| anyhow::anyhow!("Database mutex poisoned: {}", e))?;
        db.execute(
            "INSERT INTO messages (conversation_id, sender, body, citations, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.conversation_id,
                message.sender,
                message.body,
                citations,
                message.created_at.to_rfc3339(),
            ],
        )?;
        Ok(db.last_insert_rowid())
    }

    /// Latest `limit` messages of a conversation, oldest first
    pub fn list_conversation(&self, conversation_id: &str, limit: usize) -> Result<Vec<StoredMessage>> {
        let db = self
            .db
            .lock()
            .map_err(|e| anyhow::anyhow!("Database mutex poisoned: {}", e))?;
        let mut stmt = db.prepare(
            "SELECT id, conversation_id, sender, body, citations, created_at FROM (
                SELECT * FROM messages WHERE conversation_id = ?1 ORDER BY id DESC LIMIT ?2
             ) ORDER BY id ASC",
        )?;

        let rows = stmt.query_map(params![conversation_id, limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut messages = Vec::new();
        for row in rows {
            let (id, conversation_id, sender, body, citations, created_at) = row?;
            messages.push(StoredMessage {
                id,
                conversation_id,
                sender,
                body,
                citations: serde_json::from_str(&citations)
                    .with_context(|| format!("Invalid citations JSON on message {}", id))?,
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .with_context(|| format!("Invalid created_at on message {}", id))?
                    .with_timezone(&Utc),
            });
        }
        Ok(messages)
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn save_message(&self, message: &NewMessage) -> Result<i64> {
        let store = self.clone();
        let message = message.clone();
        tokio::task::spawn_blocking(move || store.insert(&message))
            .await
            .context("Message store task panicked")?
    }

    async fn conversation(&self, conversation_id: &str, limit: usize) -> Result<Vec<StoredMessage>> {
        let store = self.clone();
        let conversation_id = conversation_id.to_string();
        tokio::task::spawn_blocking(move || store.list_conversation(&conversation_id, limit))
            .await
            .context("Message store task panicked")?
    }
}
