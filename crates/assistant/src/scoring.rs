//! Lexical scoring of knowledge entries against a query.
//!
//! The score of an entry is the sum of six bounded terms:
//!
//! | term                 | range          |
//! |----------------------|----------------|
//! | substring bonus      | 0 or 0.5       |
//! | redirection boost    | 0 or 0.8       |
//! | word-level fuzzy     | 0 ..= 0.5      |
//! | phrase similarity    | 0 ..= 0.3      |
//! | field containment    | 0, 0.1 .. 0.3  |
//! | language match       | 0 or 0.05      |
//!
//! (default weights, see [`ScoringConfig`]).

use crate::config::ScoringConfig;
use crate::similarity::ratio;
use crate::text::{detect_lang, normalize, Language};
use crate::types::KnowledgeEntry;

/// Upper bound of [`score`] under the default configuration.
pub const MAX_SCORE: f64 = 2.45;

/// A query prepared once and scored against many entries.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    /// Raw user text
    pub raw: String,
    /// Normalized text
    pub normalized: String,
    /// Detected language
    pub language: Language,
}

impl PreparedQuery {
    pub fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            normalized: normalize(raw),
            language: detect_lang(raw),
        }
    }

    fn words(&self) -> Vec<&str> {
        self.normalized.split_whitespace().collect()
    }
}

/// Score `entry` against `query`.
///
/// Entries whose question normalizes to nothing only collect the metadata
/// and language terms; the engine never considers them.
pub fn score(query: &PreparedQuery, entry: &KnowledgeEntry, config: &ScoringConfig) -> f64 {
    let candidate = entry.normalized_question();

    substring_bonus(&query.normalized, &candidate, config)
        + redirection_boost(&query.normalized, entry, config)
        + word_score(query, &candidate, config)
        + phrase_score(&query.normalized, &candidate, config)
        + field_bonus(&query.normalized, entry, config)
        + language_bonus(query.language, entry, config)
}

fn substring_bonus(query: &str, candidate: &str, config: &ScoringConfig) -> f64 {
    if query.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    if candidate.contains(query) || query.contains(candidate) {
        config.substring_bonus
    } else {
        0.0
    }
}

fn redirection_boost(query: &str, entry: &KnowledgeEntry, config: &ScoringConfig) -> f64 {
    if !entry.has_intent(&config.redirection_intent) {
        return 0.0;
    }
    let named_resource = config
        .redirection_keywords
        .iter()
        .any(|kw| !kw.is_empty() && query.contains(kw.as_str()));
    if named_resource {
        config.redirection_boost
    } else {
        0.0
    }
}

fn word_score(query: &PreparedQuery, candidate: &str, config: &ScoringConfig) -> f64 {
    let query_words = query.words();
    let candidate_words: Vec<&str> = candidate.split_whitespace().collect();
    if query_words.is_empty() || candidate_words.is_empty() {
        return 0.0;
    }

    let matched: f64 = query_words
        .iter()
        .map(|qw| best_word_similarity(qw, &candidate_words))
        .filter(|&sim| sim > config.word_match_threshold)
        .sum();

    let denominator = query_words.len().max(candidate_words.len()) as f64;
    matched / denominator * config.word_weight
}

/// Best similarity of `word` against any of `targets`; exact match is 1.0.
fn best_word_similarity(word: &str, targets: &[&str]) -> f64 {
    let mut best = 0.0_f64;
    for target in targets {
        if word == *target {
            return 1.0;
        }
        best = best.max(ratio(word, target));
    }
    best
}

fn phrase_score(query: &str, candidate: &str, config: &ScoringConfig) -> f64 {
    ratio(query, candidate) * config.phrase_weight
}

fn field_bonus(query: &str, entry: &KnowledgeEntry, config: &ScoringConfig) -> f64 {
    [&entry.intent, &entry.program, &entry.level]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .map(normalize)
        .filter(|value| !value.is_empty() && query.contains(value.as_str()))
        .count() as f64
        * config.field_bonus
}

fn language_bonus(language: Language, entry: &KnowledgeEntry, config: &ScoringConfig) -> f64 {
    if entry.is_language(language) {
        config.language_bonus
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ScoringConfig {
        ScoringConfig::default()
    }

    fn score_of(query: &str, entry: &KnowledgeEntry) -> f64 {
        score(&PreparedQuery::new(query), entry, &config())
    }

    #[test]
    fn test_exact_question_qualifies() {
        let entry = KnowledgeEntry::new("How do I register for courses?", "Use the portal.");
        let s = score_of("how do i register for courses", &entry);
        // substring + full word score + full phrase score
        assert!((s - 1.3).abs() < 1e-9, "score was {}", s);
        assert!(s >= config().match_threshold);
    }

    #[test]
    fn test_redirection_boost_awarded_once() {
        let entry = KnowledgeEntry::new("where are lectures", "See the library.")
            .with_intent("resource_redirection");
        let plain = KnowledgeEntry::new("where are lectures", "See the library.");

        let boosted = score_of("lecture exam sheet", &entry);
        let unboosted = score_of("lecture exam sheet", &plain);
        assert!((boosted - unboosted - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_lecture_notes_scenario() {
        let entry = KnowledgeEntry::new("where are lectures", "Open the Lectures tab.")
            .with_intent("resource_redirection");
        let s = score_of("lecture 1 notes", &entry);
        assert!(s >= 0.8);
        assert!(s > 0.8, "expected partial word/phrase terms on top of the boost");
    }

    #[test]
    fn test_word_score_counts_close_words() {
        let query = PreparedQuery::new("lectures schedule");
        // "lectures" ~ "lecture" (0.93) and "schedule" exact
        let w = word_score(&query, "lecture schedule", &config());
        let expected = (14.0 / 15.0 + 1.0) / 2.0 * 0.5;
        assert!((w - expected).abs() < 1e-9);
    }

    #[test]
    fn test_word_score_ignores_weak_matches() {
        let query = PreparedQuery::new("cat");
        assert_eq!(word_score(&query, "dog", &config()), 0.0);
    }

    #[test]
    fn test_field_bonus_per_field() {
        let entry = KnowledgeEntry::new("x", "y")
            .with_intent("registration")
            .with_program("Mechatronics")
            .with_level("2");
        let query = "registration mechatronics level 2";
        assert!((field_bonus(query, &entry, &config()) - 0.3).abs() < 1e-9);
        assert_eq!(field_bonus("nothing here", &entry, &config()), 0.0);
    }

    #[test]
    fn test_language_bonus() {
        let entry = KnowledgeEntry::new("ما هي الساعات المعتمدة", "...").with_language("ar");
        let ar = PreparedQuery::new("ما هي الساعات");
        let en = PreparedQuery::new("credit hours");
        assert_eq!(language_bonus(ar.language, &entry, &config()), 0.05);
        assert_eq!(language_bonus(en.language, &entry, &config()), 0.0);
    }

    #[test]
    fn test_score_bounds() {
        let entry = KnowledgeEntry::new("lecture resource_redirection cs 1", "a")
            .with_intent("resource_redirection")
            .with_program("cs")
            .with_level("1")
            .with_language("en");
        let s = score_of("lecture resource_redirection cs 1", &entry);
        assert!(s <= MAX_SCORE + 1e-9);
        assert!((s - MAX_SCORE).abs() < 1e-9, "all terms maxed, got {}", s);

        let unrelated = KnowledgeEntry::new("zzzz", "a");
        let s = score_of("qqqq", &unrelated);
        assert!(s >= 0.0);
    }

    #[test]
    fn test_longer_overlap_never_scores_lower() {
        let entry = KnowledgeEntry::new("when is the final exam for physics", "a");
        let short = score_of("final", &entry);
        let longer = score_of("final exam", &entry);
        let longest = score_of("the final exam for physics", &entry);
        assert!(short <= longer);
        assert!(longer <= longest);
    }
}
