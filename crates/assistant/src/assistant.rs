//! Chat boundary of the assistant.
//!
//! Runs one chat turn: resolves the session, persists both sides of the
//! exchange and turns engine failures into a message the student can read.

use crate::conversation::{ChatRole, ChatSession, ConversationStore};
use crate::engine::AnswerEngine;
use crate::types::StructuredResponse;
use hub_core::{AppError, AppResult};
use serde::Serialize;
use std::sync::Arc;

/// Maximum number of characters of the first message used as a title.
pub const TITLE_MAX_CHARS: usize = 50;

/// Shown when the knowledge base has not been set up.
pub const SETUP_REQUIRED_MESSAGE: &str = "⚠️ **Setup Required**: The knowledge base is missing. An administrator needs to place the Q&A file at the configured knowledge path and run `hub knowledge reload`.";

/// Title reported for a turn that failed before a session existed.
pub const UNSAVED_SESSION_TITLE: &str = "New Chat";

/// Result of one chat turn.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    /// `None` when the turn failed before a session could be resolved
    pub session_id: Option<i64>,
    pub session_title: String,

    /// Text stored as the model message: the JSON-encoded structured
    /// response, or a plain error notice
    pub response: String,

    /// Structured response when the engine produced one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured: Option<StructuredResponse>,

    /// Whether a knowledge entry answered the question
    pub matched: bool,
}

impl ChatTurn {
    /// A turn carrying only an error notice.
    fn failed(session: Option<&ChatSession>, error: &AppError) -> Self {
        Self {
            session_id: session.map(|s| s.id),
            session_title: session
                .map(|s| s.title.clone())
                .unwrap_or_else(|| UNSAVED_SESSION_TITLE.to_string()),
            response: error_notice(error),
            structured: None,
            matched: false,
        }
    }
}

/// Chat assistant over an answer engine and a conversation store.
pub struct ChatAssistant {
    engine: Arc<AnswerEngine>,
    store: Arc<dyn ConversationStore>,
}

impl ChatAssistant {
    pub fn new(engine: Arc<AnswerEngine>, store: Arc<dyn ConversationStore>) -> Self {
        Self { engine, store }
    }

    pub fn engine(&self) -> &AnswerEngine {
        &self.engine
    }

    pub fn store(&self) -> &dyn ConversationStore {
        self.store.as_ref()
    }

    /// Answer `message` from `user`, in `session` or a new one.
    ///
    /// Only an empty message is an error. Every later failure, including an
    /// unknown session or a storage error, comes back as a turn whose
    /// response is an error notice.
    pub fn respond(&self, user: &str, session: Option<i64>, message: &str) -> AppResult<ChatTurn> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::Validation("No message provided".to_string()));
        }

        let session = match self.resolve_session(user, session, message) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Chat session unavailable for {}: {}", user, e);
                return Ok(ChatTurn::failed(None, &e));
            }
        };

        if let Err(e) = self.store.append(session.id, ChatRole::User, message) {
            tracing::error!("Failed to store message for session {}: {}", session.id, e);
            return Ok(ChatTurn::failed(Some(&session), &e));
        }

        let answered = self.engine.answer(message).and_then(|answer| {
            let encoded = serde_json::to_string(&answer.response)?;
            Ok((encoded, answer))
        });
        let (response, structured, matched) = match answered {
            Ok((encoded, answer)) => (encoded, Some(answer.response), answer.matched),
            Err(e) => {
                tracing::warn!("Assistant failed to answer in session {}: {}", session.id, e);
                (error_notice(&e), None, false)
            }
        };

        if let Err(e) = self.store.append(session.id, ChatRole::Model, &response) {
            tracing::error!("Failed to store model reply for session {}: {}", session.id, e);
        }

        Ok(ChatTurn {
            session_id: Some(session.id),
            session_title: session.title,
            response,
            structured,
            matched,
        })
    }

    fn resolve_session(
        &self,
        user: &str,
        session: Option<i64>,
        message: &str,
    ) -> AppResult<ChatSession> {
        match session {
            Some(id) => self.store.session(user, id)?.ok_or_else(|| {
                AppError::Validation(format!("Chat session {} not found", id))
            }),
            None => {
                let title = session_title(message);
                let created = self.store.create_session(user, &title)?;
                tracing::debug!("Started chat session {} for {}", created.id, user);
                Ok(created)
            }
        }
    }
}

/// Title of a new session: the first characters of its first message.
pub fn session_title(message: &str) -> String {
    message.trim().chars().take(TITLE_MAX_CHARS).collect()
}

/// Student-facing text for an engine failure.
pub fn error_notice(error: &AppError) -> String {
    match error {
        AppError::KnowledgeStoreMissing(_) => SETUP_REQUIRED_MESSAGE.to_string(),
        other => format!("⚠️ **Error**: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::conversation::{ChatMessage, SqliteConversationStore};
    use crate::source::{FileKnowledgeSource, StaticKnowledgeSource};
    use crate::types::KnowledgeEntry;
    use tempfile::TempDir;

    fn assistant_with(entries: Vec<KnowledgeEntry>) -> ChatAssistant {
        let engine = AnswerEngine::new(
            Box::new(StaticKnowledgeSource::new(entries)),
            ScoringConfig::default(),
        );
        let store = SqliteConversationStore::in_memory().unwrap();
        ChatAssistant::new(Arc::new(engine), Arc::new(store))
    }

    #[test]
    fn test_empty_message_has_no_side_effects() {
        let assistant = assistant_with(vec![]);
        let err = assistant.respond("alice", None, "   ").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(assistant.store().sessions("alice").unwrap().is_empty());
    }

    #[test]
    fn test_new_session_titled_from_message() {
        let assistant = assistant_with(vec![KnowledgeEntry::new(
            "How do I register for courses?",
            "Use the student portal.",
        )]);
        let long = format!("How do I register for courses? {}", "x".repeat(80));
        let turn = assistant.respond("alice", None, &long).unwrap();

        assert_eq!(turn.session_title.chars().count(), TITLE_MAX_CHARS);
        assert!(turn.session_title.starts_with("How do I register"));

        let messages = assistant.store().messages(turn.session_id.unwrap()).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, ChatRole::Model);

        let stored: StructuredResponse = serde_json::from_str(&messages[1].content).unwrap();
        assert_eq!(Some(stored), turn.structured);
    }

    #[test]
    fn test_continues_existing_session() {
        let assistant = assistant_with(vec![KnowledgeEntry::new("exam dates", "June")]);
        let first = assistant.respond("alice", None, "exam dates").unwrap();
        let second = assistant
            .respond("alice", first.session_id, "exam dates again")
            .unwrap();

        assert_eq!(first.session_id, second.session_id);
        assert_eq!(second.session_title, "exam dates");
        assert_eq!(
            assistant.store().messages(first.session_id.unwrap()).unwrap().len(),
            4
        );
    }

    #[test]
    fn test_foreign_session_becomes_error_turn() {
        let assistant = assistant_with(vec![]);
        let turn = assistant.respond("alice", None, "hello").unwrap();
        let foreign = assistant.respond("bob", turn.session_id, "hello").unwrap();

        assert_eq!(foreign.session_id, None);
        assert_eq!(foreign.session_title, UNSAVED_SESSION_TITLE);
        assert!(foreign.response.starts_with("⚠️ **Error**: "));
        assert!(foreign.structured.is_none());
        assert!(assistant.store().sessions("bob").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_session_becomes_error_turn() {
        let assistant = assistant_with(vec![]);
        let turn = assistant.respond("alice", Some(42), "hi").unwrap();
        assert_eq!(turn.session_id, None);
        assert!(turn.response.contains("42"));
    }

    /// Store whose appends always fail.
    struct BrokenStore {
        inner: SqliteConversationStore,
    }

    impl ConversationStore for BrokenStore {
        fn create_session(&self, user: &str, title: &str) -> AppResult<ChatSession> {
            self.inner.create_session(user, title)
        }

        fn session(&self, user: &str, id: i64) -> AppResult<Option<ChatSession>> {
            self.inner.session(user, id)
        }

        fn sessions(&self, user: &str) -> AppResult<Vec<ChatSession>> {
            self.inner.sessions(user)
        }

        fn append(&self, _: i64, _: ChatRole, _: &str) -> AppResult<ChatMessage> {
            Err(AppError::Storage("disk I/O error".to_string()))
        }

        fn messages(&self, session_id: i64) -> AppResult<Vec<ChatMessage>> {
            self.inner.messages(session_id)
        }

        fn delete_session(&self, user: &str, id: i64) -> AppResult<bool> {
            self.inner.delete_session(user, id)
        }
    }

    #[test]
    fn test_storage_failure_becomes_error_turn() {
        let engine = AnswerEngine::new(
            Box::new(StaticKnowledgeSource::new(vec![KnowledgeEntry::new(
                "where are lectures",
                "Lectures tab",
            )])),
            ScoringConfig::default(),
        );
        let store = BrokenStore {
            inner: SqliteConversationStore::in_memory().unwrap(),
        };
        let assistant = ChatAssistant::new(Arc::new(engine), Arc::new(store));

        let turn = assistant.respond("alice", None, "where are lectures").unwrap();
        assert!(turn.session_id.is_some());
        assert_eq!(turn.session_title, "where are lectures");
        assert!(turn.response.contains("disk I/O error"));
        assert!(turn.structured.is_none());
        assert!(!turn.matched);
    }

    #[test]
    fn test_missing_store_becomes_setup_message() {
        let temp = TempDir::new().unwrap();
        let engine = AnswerEngine::new(
            Box::new(FileKnowledgeSource::new(temp.path().join("qa.json"))),
            ScoringConfig::default(),
        );
        let store = SqliteConversationStore::in_memory().unwrap();
        let assistant = ChatAssistant::new(Arc::new(engine), Arc::new(store));

        let turn = assistant.respond("alice", None, "where are lectures").unwrap();
        assert_eq!(turn.response, SETUP_REQUIRED_MESSAGE);
        assert!(turn.structured.is_none());
        assert!(!turn.matched);

        let messages = assistant.store().messages(turn.session_id.unwrap()).unwrap();
        assert_eq!(messages[1].content, SETUP_REQUIRED_MESSAGE);
    }

    #[test]
    fn test_other_errors_are_prefixed() {
        let notice = error_notice(&AppError::Knowledge("bad file".to_string()));
        assert!(notice.starts_with("⚠️ **Error**: "));
        assert!(notice.contains("bad file"));
    }
}
