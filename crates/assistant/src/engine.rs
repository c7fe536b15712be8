//! Answer retrieval engine.
//!
//! Scores every knowledge entry against a question and either returns the
//! best match with related questions, or a language-appropriate fallback
//! with suggested questions.
//!
//! # Loading policy
//! The knowledge base is loaded lazily on the first [`AnswerEngine::answer`]
//! call, or eagerly with [`AnswerEngine::load`]. [`AnswerEngine::reload`] is
//! the administrative re-read: it builds a new snapshot and swaps it in
//! wholesale. Readers hold an `Arc` to the snapshot they started with, so a
//! reload never disturbs a query in flight. Two concurrent first loads may
//! both read the source; the last one to finish wins.

use crate::config::ScoringConfig;
use crate::scoring::{score, PreparedQuery};
use crate::source::KnowledgeSource;
use crate::text::Language;
use crate::types::{Answer, KnowledgeEntry, ResponseMetadata, ScoredCandidate, StructuredResponse};
use crate::unanswered::UnansweredLog;
use chrono::{DateTime, Utc};
use hub_core::{AppError, AppResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// An immutable, versioned copy of the knowledge base.
#[derive(Debug)]
pub struct KnowledgeSnapshot {
    /// Increments on every successful load
    pub version: u64,
    /// When this snapshot was read
    pub loaded_at: DateTime<Utc>,
    /// Entries in knowledge-base order
    pub entries: Vec<KnowledgeEntry>,
}

/// Summary of the loaded snapshot.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SnapshotInfo {
    pub version: u64,
    pub entries: usize,
    pub loaded_at: DateTime<Utc>,
    pub source: String,
}

/// Retrieval engine over a reloadable knowledge source.
pub struct AnswerEngine {
    source: Box<dyn KnowledgeSource>,
    config: ScoringConfig,
    snapshot: RwLock<Option<Arc<KnowledgeSnapshot>>>,
    versions: AtomicU64,
    unanswered: Option<UnansweredLog>,
}

impl AnswerEngine {
    pub fn new(source: Box<dyn KnowledgeSource>, config: ScoringConfig) -> Self {
        Self {
            source,
            config,
            snapshot: RwLock::new(None),
            versions: AtomicU64::new(0),
            unanswered: None,
        }
    }

    /// Log unanswered questions to `log`.
    pub fn with_unanswered_log(mut self, log: UnansweredLog) -> Self {
        self.unanswered = Some(log);
        self
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Load the knowledge base unless a snapshot is already present.
    pub fn load(&self) -> AppResult<Arc<KnowledgeSnapshot>> {
        if let Some(snapshot) = self.current()? {
            return Ok(snapshot);
        }
        self.reload()
    }

    /// Re-read the source and replace the snapshot.
    ///
    /// On failure the previous snapshot, if any, stays in place.
    pub fn reload(&self) -> AppResult<Arc<KnowledgeSnapshot>> {
        let entries = self.source.load()?;
        let version = self.versions.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Arc::new(KnowledgeSnapshot {
            version,
            loaded_at: Utc::now(),
            entries,
        });

        let mut slot = self
            .snapshot
            .write()
            .map_err(|_| AppError::Knowledge("Knowledge snapshot lock poisoned".to_string()))?;
        *slot = Some(Arc::clone(&snapshot));

        tracing::info!(
            "Loaded {} knowledge entries from {} (version {})",
            snapshot.entries.len(),
            self.source.describe(),
            version
        );
        Ok(snapshot)
    }

    fn current(&self) -> AppResult<Option<Arc<KnowledgeSnapshot>>> {
        let slot = self
            .snapshot
            .read()
            .map_err(|_| AppError::Knowledge("Knowledge snapshot lock poisoned".to_string()))?;
        Ok(slot.clone())
    }

    /// Describe the loaded snapshot, `None` before the first load.
    pub fn snapshot_info(&self) -> AppResult<Option<SnapshotInfo>> {
        Ok(self.current()?.map(|s| SnapshotInfo {
            version: s.version,
            entries: s.entries.len(),
            loaded_at: s.loaded_at,
            source: self.source.describe(),
        }))
    }

    /// Answer a question.
    pub fn answer(&self, question: &str) -> AppResult<Answer> {
        let snapshot = self.load()?;
        let query = PreparedQuery::new(question);
        let ranked = if query.normalized.is_empty() {
            Vec::new()
        } else {
            rank(&query, &snapshot.entries, &self.config)
        };

        tracing::debug!(
            "Query {:?} ({}) matched {} of {} entries",
            query.normalized,
            query.language,
            ranked.len(),
            snapshot.entries.len()
        );

        if let Some(best) = ranked.first() {
            let top_score = best.score;
            return Ok(Answer {
                response: select(&ranked, &self.config),
                matched: true,
                language: query.language,
                top_score: Some(top_score),
            });
        }

        if let Some(log) = &self.unanswered {
            log.record(question, query.language);
        }

        Ok(Answer {
            response: fallback(&snapshot.entries, query.language, &self.config),
            matched: false,
            language: query.language,
            top_score: None,
        })
    }
}

/// Score all entries and keep the qualifying ones, best first.
///
/// Entries without a question are skipped. The sort is stable, so equal
/// scores keep knowledge-base order.
pub fn rank<'a>(
    query: &PreparedQuery,
    entries: &'a [KnowledgeEntry],
    config: &ScoringConfig,
) -> Vec<ScoredCandidate<'a>> {
    let mut candidates: Vec<ScoredCandidate<'a>> = entries
        .iter()
        .filter(|entry| !entry.normalized_question().is_empty())
        .map(|entry| ScoredCandidate {
            entry,
            score: score(query, entry, config),
        })
        .filter(|c| c.score >= config.match_threshold)
        .collect();

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates
}

/// Build the response for a non-empty ranking.
pub fn select(ranked: &[ScoredCandidate<'_>], config: &ScoringConfig) -> StructuredResponse {
    let Some(best) = ranked.first() else {
        return StructuredResponse::notice(config.fallback_answer.clone());
    };

    // Only the runners-up directly after the best entry are offered
    let best_question = best.entry.question_text();
    let mut related: Vec<String> = Vec::new();
    for candidate in ranked.iter().skip(1).take(config.max_related) {
        match candidate.entry.question_text() {
            Some(question) if Some(question) != best_question => {
                push_distinct(&mut related, question)
            }
            _ => {}
        }
    }

    StructuredResponse {
        answer: best.entry.answer.clone(),
        metadata: ResponseMetadata::from_entry(best.entry),
        related_questions: related,
    }
}

/// Build the fallback response for `language`.
pub fn fallback(
    entries: &[KnowledgeEntry],
    language: Language,
    config: &ScoringConfig,
) -> StructuredResponse {
    let answer = entries
        .iter()
        .find(|e| e.has_intent(&config.fallback_intent) && e.is_language(language))
        .map(|e| e.answer.clone())
        .unwrap_or_else(|| config.fallback_answer.clone());

    StructuredResponse {
        answer,
        metadata: ResponseMetadata::default(),
        related_questions: suggestions(entries, language, config),
    }
}

/// Pick diverse suggested questions in `language`.
///
/// One question per suggestion intent first, then any other questions in
/// the same language until `min_suggestions` is reached.
pub fn suggestions(
    entries: &[KnowledgeEntry],
    language: Language,
    config: &ScoringConfig,
) -> Vec<String> {
    let in_language = || {
        entries
            .iter()
            .filter(move |e| e.is_language(language))
            .filter_map(|e| e.question_text().map(|q| (e, q)))
    };

    let mut picked: Vec<String> = Vec::new();
    for intent in &config.suggestion_intents {
        if let Some((_, question)) = in_language().find(|(e, _)| e.has_intent(intent)) {
            push_distinct(&mut picked, question);
        }
    }

    if picked.len() < config.min_suggestions {
        for (_, question) in in_language() {
            if picked.len() >= config.min_suggestions {
                break;
            }
            push_distinct(&mut picked, question);
        }
    }

    picked.truncate(config.max_suggestions);
    picked
}

fn push_distinct(list: &mut Vec<String>, question: &str) {
    if !list.iter().any(|q| q == question) {
        list.push(question.to_string());
    }
}
