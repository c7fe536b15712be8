//! Assistant type definitions.

use crate::text::{normalize, Language};
use serde::{Deserialize, Deserializer, Serialize};

/// One FAQ/rule record of the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// Question text used for matching (rule entries may have none)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,

    /// Answer returned to the student
    pub answer: String,

    /// Category tag, e.g. "fallback", "resource_redirection", "definition"
    #[serde(default, deserialize_with = "text_or_number", skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,

    /// Academic program
    #[serde(default, deserialize_with = "text_or_number", skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,

    /// Academic level (numeric in some data files)
    #[serde(default, deserialize_with = "text_or_number", skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Course name in Arabic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_name_ar: Option<String>,

    /// Course name in English
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_name_en: Option<String>,

    /// Language tag: "ar" or "en"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Integer(i64),
    Float(f64),
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<TextOrNumber>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        TextOrNumber::Text(s) => s,
        TextOrNumber::Integer(n) => n.to_string(),
        TextOrNumber::Float(n) => n.to_string(),
    }))
}

impl KnowledgeEntry {
    /// Create an entry with a question and an answer.
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: Some(question.into()),
            answer: answer.into(),
            intent: None,
            program: None,
            level: None,
            course_name_ar: None,
            course_name_en: None,
            language: None,
        }
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    pub fn with_course(mut self, ar: Option<&str>, en: Option<&str>) -> Self {
        self.course_name_ar = ar.map(str::to_string);
        self.course_name_en = en.map(str::to_string);
        self
    }

    /// Question text if present and non-blank.
    pub fn question_text(&self) -> Option<&str> {
        self.question
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    /// Normalized question, empty when the entry has none.
    pub fn normalized_question(&self) -> String {
        self.question.as_deref().map(normalize).unwrap_or_default()
    }

    /// Whether the entry carries `intent`.
    pub fn has_intent(&self, intent: &str) -> bool {
        self.intent.as_deref() == Some(intent)
    }

    /// Whether the entry is written in `language`.
    pub fn is_language(&self, language: Language) -> bool {
        self.language
            .as_deref()
            .map(|tag| language.matches_tag(tag))
            .unwrap_or(false)
    }

    /// Course display name, Arabic first.
    pub fn course(&self) -> Option<&str> {
        [&self.course_name_ar, &self.course_name_en]
            .into_iter()
            .filter_map(|c| c.as_deref())
            .find(|c| !c.trim().is_empty())
    }
}

/// A knowledge entry with its score for one query.
#[derive(Debug, Clone, Copy)]
pub struct ScoredCandidate<'a> {
    pub entry: &'a KnowledgeEntry,
    pub score: f64,
}

/// Metadata of the entry that answered a question.
///
/// Unset fields are omitted, so a fallback answer serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
}

impl ResponseMetadata {
    pub fn from_entry(entry: &KnowledgeEntry) -> Self {
        Self {
            program: entry.program.clone(),
            level: entry.level.clone(),
            course: entry.course().map(str::to_string),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.program.is_none() && self.level.is_none() && self.course.is_none()
    }
}

/// Answer contract returned to the chat layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredResponse {
    /// Answer text
    pub answer: String,

    /// Program/level/course of the matched entry
    #[serde(default)]
    pub metadata: ResponseMetadata,

    /// Follow-up questions, at most four, no duplicates
    #[serde(default)]
    pub related_questions: Vec<String>,
}

impl StructuredResponse {
    /// Plain answer with no metadata and no suggestions.
    pub fn notice(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            metadata: ResponseMetadata::default(),
            related_questions: Vec::new(),
        }
    }
}

/// Result of answering one query.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// Response delivered to the user
    pub response: StructuredResponse,

    /// Whether a knowledge entry qualified (false = fallback)
    pub matched: bool,

    /// Detected query language
    pub language: Language,

    /// Score of the best qualifying entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_score: Option<f64>,
}
