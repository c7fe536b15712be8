//! Live support chat between students or guests and staff.
//!
//! Sessions are addressed by an unguessable token. Clients poll for new
//! messages by passing the id of the last message they have seen.

use crate::store::{now, parse_time, stamp, storage_error, Catalog};
use chrono::{DateTime, Utc};
use hub_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Who wrote a support message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Student,
    Support,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::Student => "student",
            Sender::Support => "support",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sender {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "student" | "guest" => Ok(Sender::Student),
            "support" | "admin" | "staff" => Ok(Sender::Support),
            other => Err(AppError::Validation(format!("Unknown sender: {}", other))),
        }
    }
}

/// A support conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportSession {
    pub token: Uuid,
    pub user: Option<String>,
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SupportSession {
    /// Name shown to staff.
    pub fn display_name(&self) -> &str {
        self.user
            .as_deref()
            .or(self.guest_name.as_deref())
            .unwrap_or("Visitor")
    }
}

/// A support message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportMessage {
    pub id: i64,
    pub session_token: Uuid,
    pub sender: Sender,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Active session as listed for staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub token: Uuid,
    pub name: String,
    pub status: &'static str,
    pub email: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub unread: usize,
}

/// Who is opening a session.
#[derive(Debug, Clone, Default)]
pub struct Requester {
    /// Logged-in username
    pub user: Option<String>,
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
}

const SESSION_COLUMNS: &str =
    "token, user, guest_name, guest_email, is_active, created_at, updated_at";

fn parse_token(raw: String) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SupportSession> {
    Ok(SupportSession {
        token: parse_token(row.get(0)?)?,
        user: row.get(1)?,
        guest_name: row.get(2)?,
        guest_email: row.get(3)?,
        is_active: row.get(4)?,
        created_at: parse_time(row.get(5)?)?,
        updated_at: parse_time(row.get(6)?)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<SupportMessage> {
    let sender: String = row.get(2)?;
    Ok(SupportMessage {
        id: row.get(0)?,
        session_token: parse_token(row.get(1)?)?,
        sender: sender.parse().map_err(|e: AppError| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?,
        message: row.get(3)?,
        file_url: row.get(4)?,
        is_read: row.get(5)?,
        created_at: parse_time(row.get(6)?)?,
    })
}

fn find_session(conn: &Connection, token: &Uuid) -> AppResult<SupportSession> {
    let sql = format!("SELECT {} FROM support_sessions WHERE token = ?1", SESSION_COLUMNS);
    conn.query_row(&sql, [token.to_string()], session_from_row)
        .optional()
        .map_err(storage_error("Failed to load support session"))?
        .ok_or_else(|| AppError::Validation(format!("Support session {} not found", token)))
}

/// Support chat desk.
pub struct SupportDesk {
    catalog: Arc<Catalog>,
}

impl SupportDesk {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// Open a session.
    ///
    /// A logged-in user gets their active session back if they have one.
    /// Guests always get a new session.
    pub fn start(&self, requester: &Requester) -> AppResult<SupportSession> {
        self.catalog.with_transaction(|tx| {
            if let Some(user) = requester.user.as_deref() {
                let sql = format!(
                    "SELECT {} FROM support_sessions WHERE user = ?1 AND is_active = 1
                     ORDER BY updated_at DESC LIMIT 1",
                    SESSION_COLUMNS
                );
                let existing = tx
                    .query_row(&sql, [user], session_from_row)
                    .optional()
                    .map_err(storage_error("Failed to look up support session"))?;
                if let Some(session) = existing {
                    return Ok(session);
                }
            }

            let created_at = now();
            let guest_name = match (&requester.user, &requester.guest_name) {
                (_, Some(name)) if !name.trim().is_empty() => Some(name.trim().to_string()),
                (Some(_), _) => Some("Student".to_string()),
                (None, _) => Some(format!("Guest_{}", created_at.timestamp())),
            };

            let session = SupportSession {
                token: Uuid::new_v4(),
                user: requester.user.clone(),
                guest_name,
                guest_email: requester.guest_email.clone(),
                is_active: true,
                created_at,
                updated_at: created_at,
            };

            tx.execute(
                "INSERT INTO support_sessions
                     (token, user, guest_name, guest_email, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
                params![
                    session.token.to_string(),
                    session.user,
                    session.guest_name,
                    session.guest_email,
                    stamp(&created_at),
                ],
            )
            .map_err(storage_error("Failed to create support session"))?;

            tracing::info!("Opened support session {} for {}", session.token, session.display_name());
            Ok(session)
        })
    }

    /// Post a message. Reactivates an archived session.
    pub fn send(
        &self,
        token: &Uuid,
        sender: Sender,
        message: &str,
        file_url: Option<&str>,
    ) -> AppResult<SupportMessage> {
        let message = message.trim();
        let file_url = file_url.map(str::trim).filter(|u| !u.is_empty());
        if message.is_empty() && file_url.is_none() {
            return Err(AppError::Validation("Empty message and file".to_string()));
        }

        self.catalog.with_transaction(|tx| {
            find_session(tx, token)?;

            let created_at = now();
            tx.execute(
                "INSERT INTO support_messages (session_token, sender, message, file_url, is_read, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                params![token.to_string(), sender.as_str(), message, file_url, stamp(&created_at)],
            )
            .map_err(storage_error("Failed to store support message"))?;
            let id = tx.last_insert_rowid();

            tx.execute(
                "UPDATE support_sessions SET updated_at = ?2, is_active = 1 WHERE token = ?1",
                params![token.to_string(), stamp(&created_at)],
            )
            .map_err(storage_error("Failed to touch support session"))?;

            Ok(SupportMessage {
                id,
                session_token: *token,
                sender,
                message: message.to_string(),
                file_url: file_url.map(str::to_string),
                is_read: false,
                created_at,
            })
        })
    }

    /// Messages newer than `after_id`, oldest first.
    pub fn poll(&self, token: &Uuid, after_id: i64) -> AppResult<Vec<SupportMessage>> {
        self.catalog.with_conn(|conn| {
            find_session(conn, token)?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, session_token, sender, message, file_url, is_read, created_at
                     FROM support_messages WHERE session_token = ?1 AND id > ?2
                     ORDER BY created_at, id",
                )
                .map_err(storage_error("Failed to prepare message query"))?;
            let rows = stmt
                .query_map(params![token.to_string(), after_id], message_from_row)
                .map_err(storage_error("Failed to query support messages"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(storage_error("Failed to read support message"))
        })
    }

    /// Active sessions, most recently updated first.
    pub fn active_sessions(&self) -> AppResult<Vec<SessionSummary>> {
        self.catalog.with_conn(|conn| {
            let sql = format!(
                "SELECT {}, (SELECT COUNT(*) FROM support_messages m
                     WHERE m.session_token = s.token AND m.sender = 'student' AND m.is_read = 0)
                 FROM support_sessions s WHERE is_active = 1 ORDER BY updated_at DESC",
                SESSION_COLUMNS
            );
            let mut stmt = conn
                .prepare(&sql)
                .map_err(storage_error("Failed to prepare session query"))?;
            let rows = stmt
                .query_map([], |row| {
                    let session = session_from_row(row)?;
                    let unread: i64 = row.get(7)?;
                    Ok((session, unread as usize))
                })
                .map_err(storage_error("Failed to query support sessions"))?;

            let mut summaries = Vec::new();
            for row in rows {
                let (session, unread) = row.map_err(storage_error("Failed to read support session"))?;
                summaries.push(SessionSummary {
                    token: session.token,
                    name: session.display_name().to_string(),
                    status: if session.user.is_some() { "LOGGED IN" } else { "GUEST" },
                    email: session.guest_email.clone(),
                    updated_at: session.updated_at,
                    unread,
                });
            }
            Ok(summaries)
        })
    }

    /// Archive a session. History is kept.
    pub fn end(&self, token: &Uuid) -> AppResult<()> {
        self.catalog.with_conn(|conn| {
            find_session(conn, token)?;
            conn.execute(
                "UPDATE support_sessions SET is_active = 0 WHERE token = ?1",
                [token.to_string()],
            )
            .map_err(storage_error("Failed to archive support session"))?;
            Ok(())
        })
    }

    /// Mark the student messages of a session read. Returns how many changed.
    pub fn mark_read(&self, token: &Uuid) -> AppResult<usize> {
        self.catalog.with_conn(|conn| {
            find_session(conn, token)?;
            conn.execute(
                "UPDATE support_messages SET is_read = 1
                 WHERE session_token = ?1 AND sender = 'student' AND is_read = 0",
                [token.to_string()],
            )
            .map_err(storage_error("Failed to mark messages read"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desk() -> SupportDesk {
        SupportDesk::new(Arc::new(Catalog::in_memory().unwrap()))
    }

    fn guest(name: &str) -> Requester {
        Requester {
            guest_name: Some(name.to_string()),
            guest_email: Some(format!("{}@example.test", name)),
            ..Default::default()
        }
    }

    #[test]
    fn test_logged_in_user_reuses_active_session() {
        let desk = desk();
        let who = Requester {
            user: Some("mona".to_string()),
            ..Default::default()
        };
        let first = desk.start(&who).unwrap();
        let second = desk.start(&who).unwrap();
        assert_eq!(first.token, second.token);
        assert_eq!(first.guest_name.as_deref(), Some("Student"));

        desk.end(&first.token).unwrap();
        let third = desk.start(&who).unwrap();
        assert_ne!(third.token, first.token);
    }

    #[test]
    fn test_guests_get_fresh_sessions() {
        let desk = desk();
        let a = desk.start(&guest("sara")).unwrap();
        let b = desk.start(&guest("sara")).unwrap();
        assert_ne!(a.token, b.token);

        let anonymous = desk.start(&Requester::default()).unwrap();
        assert!(anonymous.guest_name.unwrap().starts_with("Guest_"));
    }

    #[test]
    fn test_send_and_poll() {
        let desk = desk();
        let session = desk.start(&guest("sara")).unwrap();

        let first = desk.send(&session.token, Sender::Student, "Hello", None).unwrap();
        desk.send(&session.token, Sender::Support, "Hi, how can I help?", None)
            .unwrap();
        desk.send(&session.token, Sender::Student, "", Some("https://files.test/a.pdf"))
            .unwrap();

        let all = desk.poll(&session.token, 0).unwrap();
        assert_eq!(all.len(), 3);
        let newer = desk.poll(&session.token, first.id).unwrap();
        assert_eq!(newer.len(), 2);
        assert_eq!(newer[0].sender, Sender::Support);
        assert_eq!(newer[1].file_url.as_deref(), Some("https://files.test/a.pdf"));
    }

    #[test]
    fn test_empty_message_rejected() {
        let desk = desk();
        let session = desk.start(&guest("sara")).unwrap();
        let err = desk.send(&session.token, Sender::Student, "  ", None).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_unknown_token_rejected() {
        let desk = desk();
        let token = Uuid::new_v4();
        assert!(desk.send(&token, Sender::Student, "hi", None).is_err());
        assert!(desk.poll(&token, 0).is_err());
        assert!(desk.end(&token).is_err());
    }

    #[test]
    fn test_staff_view_unread_and_archive() {
        let desk = desk();
        let session = desk.start(&guest("sara")).unwrap();
        desk.send(&session.token, Sender::Student, "one", None).unwrap();
        desk.send(&session.token, Sender::Student, "two", None).unwrap();
        desk.send(&session.token, Sender::Support, "reply", None).unwrap();

        let listed = desk.active_sessions().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].unread, 2);
        assert_eq!(listed[0].status, "GUEST");
        assert_eq!(listed[0].name, "sara");

        assert_eq!(desk.mark_read(&session.token).unwrap(), 2);
        assert_eq!(desk.active_sessions().unwrap()[0].unread, 0);

        desk.end(&session.token).unwrap();
        assert!(desk.active_sessions().unwrap().is_empty());

        // A new message reopens the archived session
        desk.send(&session.token, Sender::Student, "again", None).unwrap();
        assert_eq!(desk.active_sessions().unwrap().len(), 1);
    }

    #[test]
    fn test_sender_parse() {
        assert_eq!("admin".parse::<Sender>().unwrap(), Sender::Support);
        assert_eq!("Guest".parse::<Sender>().unwrap(), Sender::Student);
        assert!("bot".parse::<Sender>().is_err());
    }
}
