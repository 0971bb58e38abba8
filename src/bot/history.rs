//! Persistent SQLite store for conversation history.
//!
//! One row per answered message. Rows are append-only: nothing in the bot
//! ever updates or deletes them, and per-chat retrieval preserves insertion
//! order so the assembled prompt stays temporally coherent.

use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// A single answered message, immutable once written.
#[derive(Debug, Clone)]
pub struct ConversationRecord {
    pub chat_id: String,
    pub user_id: String,
    pub username: String,
    pub message: String,
    pub response: String,
    /// Local time, "%Y-%m-%d %H:%M:%S".
    pub timestamp: String,
}

/// One history row as replayed into the prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub username: String,
    pub message: String,
    pub response: String,
}

/// Conversation history store backed by SQLite.
pub struct HistoryStore {
    conn: Mutex<Connection>,
}

impl HistoryStore {
    /// Create an in-memory store (tests).
    pub fn in_memory() -> Result<Self, String> {
        let conn = Connection::open_in_memory()
            .map_err(|e| format!("Failed to create in-memory database: {e}"))?;
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema()?;
        Ok(store)
    }

    /// Open (or create) the store at the given path.
    pub fn open(path: &Path) -> Result<Self, String> {
        let conn = Connection::open(path)
            .map_err(|e| format!("Failed to open database {:?}: {e}", path))?;
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema()?;

        let count = store.record_count();
        info!("Loaded conversation history from {:?} ({} records)", path, count);
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), String> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS historico_conversas (
                chat_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                user_username TEXT NOT NULL,
                mensagem TEXT NOT NULL,
                resposta TEXT NOT NULL,
                data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_historico_chat_id ON historico_conversas(chat_id);
        "#).map_err(|e| format!("Failed to initialize history schema: {e}"))
    }

    /// Append a record. Durable on return; no write buffering.
    pub fn append(&self, record: &ConversationRecord) -> Result<(), String> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO historico_conversas (chat_id, user_id, user_username, mensagem, resposta, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.chat_id,
                record.user_id,
                record.username,
                record.message,
                record.response,
                record.timestamp
            ],
        )
        .map_err(|e| format!("Failed to append history record: {e}"))?;
        Ok(())
    }

    /// Full history of one chat, oldest first. Empty vec for unknown chats.
    pub fn history_for(&self, chat_id: &str) -> Result<Vec<HistoryEntry>, String> {
        self.history_for_limited(chat_id, 0)
    }

    /// History of one chat, oldest first, capped to the most recent `limit`
    /// records when `limit > 0`.
    pub fn history_for_limited(&self, chat_id: &str, limit: usize) -> Result<Vec<HistoryEntry>, String> {
        let conn = self.conn.lock().unwrap();

        // rowid breaks ties between records written within the same second
        let mut stmt = conn
            .prepare(
                "SELECT user_username, mensagem, resposta FROM historico_conversas
                 WHERE chat_id = ?1
                 ORDER BY data, rowid",
            )
            .map_err(|e| format!("Failed to prepare history query: {e}"))?;

        let rows = stmt
            .query_map(params![chat_id], |row| {
                Ok(HistoryEntry {
                    username: row.get(0)?,
                    message: row.get(1)?,
                    response: row.get(2)?,
                })
            })
            .map_err(|e| format!("Failed to query history: {e}"))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(|e| format!("Failed to read history row: {e}"))?);
        }

        if limit > 0 && entries.len() > limit {
            entries.drain(..entries.len() - limit);
        }
        Ok(entries)
    }

    /// Total records across all chats.
    pub fn record_count(&self) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM historico_conversas", [], |row| {
            row.get::<_, i64>(0)
        })
        .unwrap_or(0) as usize
    }
}
