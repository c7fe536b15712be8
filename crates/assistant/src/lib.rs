//! Study assistant.
//!
//! Answers student questions from a curated bilingual Q&A knowledge base
//! using deterministic lexical scoring, and keeps per-user conversations.

pub mod assistant;
pub mod config;
pub mod conversation;
pub mod engine;
pub mod scoring;
pub mod similarity;
pub mod source;
pub mod text;
pub mod types;
pub mod unanswered;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use assistant::{ChatAssistant, ChatTurn};
pub use config::ScoringConfig;
pub use conversation::{ChatMessage, ChatRole, ChatSession, ConversationStore, SqliteConversationStore};
pub use engine::{AnswerEngine, KnowledgeSnapshot, SnapshotInfo};
pub use source::{open_source, KnowledgeSource};
pub use text::Language;
pub use types::{Answer, KnowledgeEntry, ResponseMetadata, StructuredResponse};
pub use unanswered::{UnansweredLog, UnansweredRecord};

use hub_core::{AppResult, HubConfig};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Knowledge base statistics.
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeStats {
    pub source: String,
    pub version: u64,
    pub entries: usize,
    pub questions: usize,
    pub by_intent: BTreeMap<String, usize>,
    pub by_language: BTreeMap<String, usize>,
    pub unanswered: usize,
}

/// Build an answer engine from the hub configuration.
pub fn open_engine(config: &HubConfig) -> AppResult<AnswerEngine> {
    let scoring = config::load_scoring_config(&config.workspace)?;
    let source = open_source(&config.knowledge_path);
    Ok(AnswerEngine::new(source, scoring)
        .with_unanswered_log(UnansweredLog::new(&config.unanswered_log)))
}

/// Build the chat assistant from the hub configuration.
pub fn open_assistant(config: &HubConfig) -> AppResult<ChatAssistant> {
    let engine = open_engine(config)?;
    let store = SqliteConversationStore::open(&config.database)?;
    Ok(ChatAssistant::new(Arc::new(engine), Arc::new(store)))
}

/// Load the knowledge base and summarize it.
pub fn stats(config: &HubConfig) -> AppResult<KnowledgeStats> {
    let engine = open_engine(config)?;
    let snapshot = engine.load()?;

    let mut by_intent = BTreeMap::new();
    let mut by_language = BTreeMap::new();
    for entry in &snapshot.entries {
        let intent = entry.intent.clone().unwrap_or_else(|| "(none)".to_string());
        *by_intent.entry(intent).or_insert(0) += 1;
        let language = entry.language.clone().unwrap_or_else(|| "(none)".to_string());
        *by_language.entry(language).or_insert(0) += 1;
    }

    let unanswered = UnansweredLog::new(&config.unanswered_log).read_all()?.len();

    Ok(KnowledgeStats {
        source: open_source(&config.knowledge_path).describe(),
        version: snapshot.version,
        entries: snapshot.entries.len(),
        questions: snapshot
            .entries
            .iter()
            .filter(|e| e.question_text().is_some())
            .count(),
        by_intent,
        by_language,
        unanswered,
    })
}
