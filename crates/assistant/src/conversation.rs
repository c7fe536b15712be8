//! Persistent assistant conversations.
//!
//! Sessions belong to one user; every lookup is scoped by that user so one
//! student can never read or delete another student's chat.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use hub_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(ChatRole::User),
            "model" => Ok(ChatRole::Model),
            other => Err(AppError::Storage(format!("Unknown chat role: {}", other))),
        }
    }
}

/// One assistant conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: i64,
    pub user: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub session_id: i64,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Storage for assistant conversations.
pub trait ConversationStore: Send + Sync {
    /// Create a session owned by `user`.
    fn create_session(&self, user: &str, title: &str) -> AppResult<ChatSession>;

    /// Session `id` if it exists and belongs to `user`.
    fn session(&self, user: &str, id: i64) -> AppResult<Option<ChatSession>>;

    /// Sessions of `user`, most recently active first.
    fn sessions(&self, user: &str) -> AppResult<Vec<ChatSession>>;

    /// Append a message and bump the session's `updated_at`.
    fn append(&self, session_id: i64, role: ChatRole, content: &str) -> AppResult<ChatMessage>;

    /// Messages of a session, oldest first.
    fn messages(&self, session_id: i64) -> AppResult<Vec<ChatMessage>>;

    /// Delete a session and its messages. Returns false if `user` has no
    /// such session.
    fn delete_session(&self, user: &str, id: i64) -> AppResult<bool>;
}

/// SQLite-backed conversation store.
pub struct SqliteConversationStore {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ai_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user TEXT NOT NULL,
    title TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ai_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id INTEGER NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    FOREIGN KEY (session_id) REFERENCES ai_sessions(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_ai_sessions_user ON ai_sessions(user);
CREATE INDEX IF NOT EXISTS idx_ai_messages_session ON ai_messages(session_id);
"#;

fn storage_error(context: &str) -> impl Fn(rusqlite::Error) -> AppError + '_ {
    move |e| AppError::Storage(format!("{}: {}", context, e))
}

/// Fixed-width RFC 3339 so text order equals time order.
fn stamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

fn session_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatSession> {
    Ok(ChatSession {
        id: row.get(0)?,
        user: row.get(1)?,
        title: row.get(2)?,
        created_at: parse_time(row.get(3)?)?,
        updated_at: parse_time(row.get(4)?)?,
    })
}

impl SqliteConversationStore {
    /// Open (or create) the store at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path).map_err(storage_error("Failed to open conversation store"))?;
        Self::init(conn)
    }

    /// Store that lives only as long as the value.
    pub fn in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory().map_err(storage_error("Failed to open in-memory store"))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(storage_error("Failed to enable foreign keys"))?;
        conn.execute_batch(SCHEMA)
            .map_err(storage_error("Failed to create conversation tables"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Storage("Conversation store lock poisoned".to_string()))
    }
}

impl ConversationStore for SqliteConversationStore {
    fn create_session(&self, user: &str, title: &str) -> AppResult<ChatSession> {
        let now = Utc::now().trunc_subsecs(6);
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO ai_sessions (user, title, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![user, title, stamp(&now)],
        )
        .map_err(storage_error("Failed to create session"))?;

        Ok(ChatSession {
            id: conn.last_insert_rowid(),
            user: user.to_string(),
            title: title.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    fn session(&self, user: &str, id: i64) -> AppResult<Option<ChatSession>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, user, title, created_at, updated_at FROM ai_sessions
             WHERE id = ?1 AND user = ?2",
            params![id, user],
            session_from_row,
        )
        .optional()
        .map_err(storage_error("Failed to load session"))
    }

    fn sessions(&self, user: &str) -> AppResult<Vec<ChatSession>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user, title, created_at, updated_at FROM ai_sessions
                 WHERE user = ?1 ORDER BY updated_at DESC, id DESC",
            )
            .map_err(storage_error("Failed to prepare session query"))?;

        let rows = stmt
            .query_map([user], session_from_row)
            .map_err(storage_error("Failed to query sessions"))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage_error("Failed to read session"))
    }

    fn append(&self, session_id: i64, role: ChatRole, content: &str) -> AppResult<ChatMessage> {
        let now = Utc::now().trunc_subsecs(6);
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(storage_error("Failed to begin transaction"))?;

        let touched = tx
            .execute(
                "UPDATE ai_sessions SET updated_at = ?1 WHERE id = ?2",
                params![stamp(&now), session_id],
            )
            .map_err(storage_error("Failed to touch session"))?;
        if touched == 0 {
            return Err(AppError::Validation(format!(
                "Chat session {} does not exist",
                session_id
            )));
        }

        tx.execute(
            "INSERT INTO ai_messages (session_id, role, content, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![session_id, role.as_str(), content, stamp(&now)],
        )
        .map_err(storage_error("Failed to append message"))?;
        let id = tx.last_insert_rowid();

        tx.commit().map_err(storage_error("Failed to commit message"))?;

        Ok(ChatMessage {
            id,
            session_id,
            role,
            content: content.to_string(),
            timestamp: now,
        })
    }

    fn messages(&self, session_id: i64) -> AppResult<Vec<ChatMessage>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, session_id, role, content, timestamp FROM ai_messages
                 WHERE session_id = ?1 ORDER BY timestamp, id",
            )
            .map_err(storage_error("Failed to prepare message query"))?;

        let rows = stmt
            .query_map([session_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    parse_time(row.get(4)?)?,
                ))
            })
            .map_err(storage_error("Failed to query messages"))?;

        let mut messages = Vec::new();
        for row in rows {
            let (id, session_id, role, content, timestamp) =
                row.map_err(storage_error("Failed to read message"))?;
            messages.push(ChatMessage {
                id,
                session_id,
                role: role.parse()?,
                content,
                timestamp,
            });
        }
        Ok(messages)
    }

    fn delete_session(&self, user: &str, id: i64) -> AppResult<bool> {
        let conn = self.conn()?;
        let deleted = conn
            .execute(
                "DELETE FROM ai_sessions WHERE id = ?1 AND user = ?2",
                params![id, user],
            )
            .map_err(storage_error("Failed to delete session"))?;

        if deleted > 0 {
            tracing::info!("Deleted chat session {} of {}", id, user);
        }
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_and_append() {
        let store = SqliteConversationStore::in_memory().unwrap();
        let session = store.create_session("alice", "Where are lectures?").unwrap();

        store.append(session.id, ChatRole::User, "Where are lectures?").unwrap();
        store.append(session.id, ChatRole::Model, "{\"answer\":\"tab\"}").unwrap();

        let messages = store.messages(session.id).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[1].role, ChatRole::Model);

        let reloaded = store.session("alice", session.id).unwrap().unwrap();
        assert!(reloaded.updated_at >= session.updated_at);
    }

    #[test]
    fn test_sessions_are_scoped_by_user() {
        let store = SqliteConversationStore::in_memory().unwrap();
        let mine = store.create_session("alice", "one").unwrap();
        store.create_session("bob", "two").unwrap();

        assert_eq!(store.sessions("alice").unwrap().len(), 1);
        assert!(store.session("bob", mine.id).unwrap().is_none());
        assert!(!store.delete_session("bob", mine.id).unwrap());
        assert!(store.delete_session("alice", mine.id).unwrap());
        assert!(store.sessions("alice").unwrap().is_empty());
    }

    #[test]
    fn test_delete_removes_messages() {
        let store = SqliteConversationStore::in_memory().unwrap();
        let session = store.create_session("alice", "t").unwrap();
        store.append(session.id, ChatRole::User, "hi").unwrap();

        store.delete_session("alice", session.id).unwrap();
        assert!(store.messages(session.id).unwrap().is_empty());
    }

    #[test]
    fn test_append_to_unknown_session() {
        let store = SqliteConversationStore::in_memory().unwrap();
        let err = store.append(42, ChatRole::User, "hi").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_open_persists_to_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("db").join("hub.sqlite");
        {
            let store = SqliteConversationStore::open(&path).unwrap();
            store.create_session("alice", "kept").unwrap();
        }
        let store = SqliteConversationStore::open(&path).unwrap();
        assert_eq!(store.sessions("alice").unwrap()[0].title, "kept");
    }
}
