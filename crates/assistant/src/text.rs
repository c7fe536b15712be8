//! Text normalization and query language detection.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// First and last code points of the Arabic block.
const ARABIC_START: char = '\u{0600}';
const ARABIC_END: char = '\u{06FF}';

fn punctuation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s\x{0600}-\x{06FF}]").expect("static regex"))
}

/// Language of a query, as detected from its script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "ar-eg")]
    Arabic,
    #[serde(rename = "en-us")]
    English,
}

impl Language {
    /// Full language tag ("ar-eg" / "en-us").
    pub fn tag(&self) -> &'static str {
        match self {
            Language::Arabic => "ar-eg",
            Language::English => "en-us",
        }
    }

    /// Primary subtag ("ar" / "en").
    pub fn primary(&self) -> &'static str {
        match self {
            Language::Arabic => "ar",
            Language::English => "en",
        }
    }

    /// Whether a knowledge entry's language tag denotes this language.
    ///
    /// Entries are usually tagged with the primary subtag only, so both the
    /// full tag and the primary subtag are accepted.
    pub fn matches_tag(&self, tag: &str) -> bool {
        let tag = tag.trim();
        tag.eq_ignore_ascii_case(self.tag()) || tag.eq_ignore_ascii_case(self.primary())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Whether `c` lies in the Arabic block.
pub fn is_arabic(c: char) -> bool {
    (ARABIC_START..=ARABIC_END).contains(&c)
}

/// Normalize text for matching.
///
/// Lower-cases, drops everything that is not a word character, whitespace
/// or Arabic script, unifies alef variants, taa marbuta and alef maksura,
/// then trims. `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = punctuation().replace_all(&lowered, "");

    let unified: String = stripped
        .chars()
        .map(|c| match c {
            'أ' | 'إ' | 'آ' => 'ا',
            'ة' => 'ه',
            'ى' => 'ي',
            other => other,
        })
        .collect();

    unified.trim().to_string()
}

/// Detect the language of a query.
///
/// Any Arabic-script code point makes the query Arabic; everything else,
/// including empty input, is English.
pub fn detect_lang(text: &str) -> Language {
    if text.chars().any(is_arabic) {
        Language::Arabic
    } else {
        Language::English
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("  Where are the LECTURES?! "), "where are the lectures");
        assert_eq!(normalize("resource_redirection"), "resource_redirection");
    }

    #[test]
    fn test_normalize_arabic_unification() {
        assert_eq!(normalize("أإآا"), "اااا");
        assert_eq!(normalize("محاضرة"), "محاضره");
        assert_eq!(normalize("مستوى"), "مستوي");
        // Arabic question mark is inside the Arabic block and is kept
        assert_eq!(normalize("ما هو؟"), "ما هو؟");
    }

    #[test]
    fn test_normalize_trims_after_stripping() {
        // Space left behind by removed punctuation must not survive
        assert_eq!(normalize("hello ?"), "hello");
        assert_eq!(normalize("! exam schedule ."), "exam schedule");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "Hello, World!",
            "  trailing punctuation ?",
            "أين أجد المحاضرات؟",
            "İstanbul ÉCOLE",
            "mixed عربي and English!!",
            "",
            "???",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_detect_lang() {
        assert_eq!(detect_lang("where is the exam schedule"), Language::English);
        assert_eq!(detect_lang("exam امتحان"), Language::Arabic);
        assert_eq!(detect_lang(""), Language::English);
        assert_eq!(detect_lang("ÉCOLE 123"), Language::English);
    }

    #[test]
    fn test_matches_tag() {
        assert!(Language::Arabic.matches_tag("ar"));
        assert!(Language::Arabic.matches_tag("AR-EG"));
        assert!(!Language::Arabic.matches_tag("en"));
        assert!(Language::English.matches_tag("en-us"));
    }
}
