//! End-to-end retrieval scenarios over a small bilingual knowledge base.

use crate::config::{ScoringConfig, DEFAULT_FALLBACK_ANSWER};
use crate::engine::AnswerEngine;
use crate::source::{FileKnowledgeSource, StaticKnowledgeSource};
use crate::text::Language;
use crate::types::KnowledgeEntry;
use std::fs;
use tempfile::TempDir;

#[cfg(test)]
mod tests {
    use super::*;

    fn guide() -> Vec<KnowledgeEntry> {
        vec![
            KnowledgeEntry::new("where are lectures", "Open the Lectures tab of your subject.")
                .with_intent("resource_redirection")
                .with_language("en"),
            KnowledgeEntry::new("What is a credit hour?", "One hour of lecture per week.")
                .with_intent("definition")
                .with_language("en"),
            KnowledgeEntry::new("How do I register for courses?", "Use the student portal.")
                .with_intent("registration")
                .with_language("en"),
            KnowledgeEntry::new("أين أجد المحاضرات؟", "من تبويب المحاضرات في صفحة المادة.")
                .with_intent("resource_redirection")
                .with_language("ar"),
            KnowledgeEntry::new("Who teaches Circuits 2?", "Dr. Hany.")
                .with_program("Mechatronics")
                .with_level(2.to_string())
                .with_course(Some("دوائر ٢"), Some("Circuits 2"))
                .with_language("en"),
            KnowledgeEntry {
                question: None,
                ..KnowledgeEntry::new("", "I could not find that. Try asking about registration.")
                    .with_intent("fallback")
                    .with_language("en")
            },
        ]
    }

    fn engine(entries: Vec<KnowledgeEntry>) -> AnswerEngine {
        AnswerEngine::new(
            Box::new(StaticKnowledgeSource::new(entries)),
            ScoringConfig::default(),
        )
    }

    #[test]
    fn test_exact_question_is_answered() {
        let answer = engine(guide()).answer("What is a credit hour?").unwrap();
        assert!(answer.matched);
        assert_eq!(answer.response.answer, "One hour of lecture per week.");
        assert!(answer.top_score.unwrap() >= 0.35);
    }

    #[test]
    fn test_lecture_notes_redirects() {
        let answer = engine(guide()).answer("lecture 1 notes").unwrap();
        assert!(answer.matched);
        assert_eq!(answer.response.answer, "Open the Lectures tab of your subject.");
        assert!(answer.top_score.unwrap() >= 0.8);
    }

    #[test]
    fn test_arabic_variants_match() {
        let answer = engine(guide()).answer("اين اجد المحاضرات").unwrap();
        assert!(answer.matched);
        assert_eq!(answer.language, Language::Arabic);
        assert_eq!(answer.response.answer, "من تبويب المحاضرات في صفحة المادة.");
    }

    #[test]
    fn test_metadata_of_matched_entry() {
        let answer = engine(guide()).answer("who teaches circuits 2").unwrap();
        let metadata = &answer.response.metadata;
        assert_eq!(metadata.program.as_deref(), Some("Mechatronics"));
        assert_eq!(metadata.level.as_deref(), Some("2"));
        assert_eq!(metadata.course.as_deref(), Some("دوائر ٢"));
    }

    #[test]
    fn test_english_fallback_with_suggestions() {
        let answer = engine(guide()).answer("parking permit price").unwrap();
        assert!(!answer.matched);
        assert_eq!(
            answer.response.answer,
            "I could not find that. Try asking about registration."
        );
        assert!(answer.response.metadata.is_empty());

        let related = &answer.response.related_questions;
        assert!(related.len() >= 3 && related.len() <= 4);
        assert_eq!(related[0], "What is a credit hour?");
        assert_eq!(related[1], "How do I register for courses?");
    }

    #[test]
    fn test_arabic_query_without_arabic_fallback_gets_apology() {
        let entries = vec![
            KnowledgeEntry::new("How do I register?", "Use the portal.").with_language("en"),
            KnowledgeEntry {
                question: None,
                ..KnowledgeEntry::new("", "English fallback")
                    .with_intent("fallback")
                    .with_language("en")
            },
        ];
        let answer = engine(entries).answer("ما هو نظام الساعات المعتمدة").unwrap();
        assert!(!answer.matched);
        assert_eq!(answer.response.answer, DEFAULT_FALLBACK_ANSWER);
        assert!(answer.response.related_questions.is_empty());
    }

    #[test]
    fn test_wrapped_json_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("qa.json");
        fs::write(
            &path,
            r#"{"QA_DATA":[{"question":"exam schedule","answer":"See the board","level":1}]}"#,
        )
        .unwrap();

        let engine = AnswerEngine::new(
            Box::new(FileKnowledgeSource::new(&path)),
            ScoringConfig::default(),
        );
        let answer = engine.answer("Exam schedule?").unwrap();
        assert_eq!(answer.response.answer, "See the board");
        assert_eq!(answer.response.metadata.level.as_deref(), Some("1"));
    }
}
