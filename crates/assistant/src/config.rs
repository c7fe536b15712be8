//! Scoring configuration.
//!
//! Every weight, threshold and keyword list used by the retrieval engine
//! lives here so it can be tuned from `.hub/scoring.yaml` without touching
//! matching logic.

use hub_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Generic apology used when no fallback entry exists for the language.
pub const DEFAULT_FALLBACK_ANSWER: &str = "Sorry, this question is not currently in the college guide. You can ask me about courses, registration, requirements, or studying.";

/// Weights, thresholds and keyword sets of the retrieval engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoringConfig {
    /// Minimum total score for an entry to qualify as a match
    pub match_threshold: f64,

    /// Bonus when either normalized text contains the other
    pub substring_bonus: f64,

    /// Intent whose entries receive the keyword boost
    pub redirection_intent: String,

    /// Boost for redirection entries when the query names a resource
    pub redirection_boost: f64,

    /// Normalized resource keywords (lecture, exam, sheet, solutions)
    pub redirection_keywords: Vec<String>,

    /// A query word counts as matched above this similarity
    pub word_match_threshold: f64,

    /// Weight of the word-level fuzzy term
    pub word_weight: f64,

    /// Weight of the whole-phrase similarity term
    pub phrase_weight: f64,

    /// Bonus per metadata field (intent, program, level) found in the query
    pub field_bonus: f64,

    /// Bonus when the entry language equals the query language
    pub language_bonus: f64,

    /// Number of runner-up entries offered as related questions
    pub max_related: usize,

    /// Intent of per-language fallback entries
    pub fallback_intent: String,

    /// Answer used when no fallback entry matches the query language
    pub fallback_answer: String,

    /// Intents tried, in order, for fallback suggestions
    pub suggestion_intents: Vec<String>,

    /// Pad suggestions with other questions until this many are found
    pub min_suggestions: usize,

    /// Upper bound on fallback suggestions
    pub max_suggestions: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.35,
            substring_bonus: 0.5,
            redirection_intent: "resource_redirection".to_string(),
            redirection_boost: 0.8,
            redirection_keywords: ["lecture", "exam", "sheet", "محاضره", "امتحان", "شيت", "حلول"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            word_match_threshold: 0.75,
            word_weight: 0.5,
            phrase_weight: 0.3,
            field_bonus: 0.1,
            language_bonus: 0.05,
            max_related: 3,
            fallback_intent: "fallback".to_string(),
            fallback_answer: DEFAULT_FALLBACK_ANSWER.to_string(),
            suggestion_intents: ["definition", "advice", "registration", "study_tips"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_suggestions: 3,
            max_suggestions: 4,
        }
    }
}

impl ScoringConfig {
    /// Largest score any entry can reach under this configuration.
    pub fn max_score(&self) -> f64 {
        self.substring_bonus
            + self.redirection_boost
            + self.word_weight
            + self.phrase_weight
            + 3.0 * self.field_bonus
            + self.language_bonus
    }

    /// Reject configurations that would break the score range.
    pub fn validate(&self) -> AppResult<()> {
        let weights = [
            ("matchThreshold", self.match_threshold),
            ("substringBonus", self.substring_bonus),
            ("redirectionBoost", self.redirection_boost),
            ("wordMatchThreshold", self.word_match_threshold),
            ("wordWeight", self.word_weight),
            ("phraseWeight", self.phrase_weight),
            ("fieldBonus", self.field_bonus),
            ("languageBonus", self.language_bonus),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::Config(format!(
                    "scoring.{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        if self.min_suggestions > self.max_suggestions {
            return Err(AppError::Config(
                "scoring.minSuggestions cannot exceed scoring.maxSuggestions".to_string(),
            ));
        }

        Ok(())
    }
}

/// Load scoring configuration.
///
/// Loads from `.hub/scoring.yaml` if it exists, otherwise returns defaults.
/// Keys missing from the file keep their default values.
pub fn load_scoring_config(workspace: &Path) -> AppResult<ScoringConfig> {
    let config_path = get_scoring_config_path(workspace);

    if !config_path.exists() {
        tracing::debug!("Using default scoring config (no {:?})", config_path);
        return Ok(ScoringConfig::default());
    }

    let content = fs::read_to_string(&config_path).map_err(|e| {
        AppError::Config(format!("Failed to read config at {:?}: {}", config_path, e))
    })?;

    let config: ScoringConfig = serde_yaml::from_str(&content).map_err(|e| {
        AppError::Config(format!("Failed to parse config at {:?}: {}", config_path, e))
    })?;

    config.validate()?;
    tracing::debug!("Loaded scoring config from {:?}", config_path);
    Ok(config)
}

/// Save scoring configuration.
pub fn save_scoring_config(workspace: &Path, config: &ScoringConfig) -> AppResult<()> {
    let config_path = get_scoring_config_path(workspace);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::Config(format!("Failed to create config directory: {}", e))
        })?;
    }

    let yaml = serde_yaml::to_string(config)?;
    fs::write(&config_path, yaml).map_err(|e| {
        AppError::Config(format!("Failed to write config to {:?}: {}", config_path, e))
    })?;

    Ok(())
}

/// Get the path to the scoring config file.
pub fn get_scoring_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".hub").join("scoring.yaml")
}
