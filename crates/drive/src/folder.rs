//! Folder reference parsing.

use regex::Regex;
use std::sync::OnceLock;

fn folders_path() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/folders/([a-zA-Z0-9_-]+)").expect("static regex"))
}

fn id_param() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"id=([a-zA-Z0-9_-]+)").expect("static regex"))
}

fn raw_id() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("static regex"))
}

/// Extract a folder id from a Drive URL or a raw id.
///
/// Accepted forms, tried in order:
/// - `https://drive.google.com/drive/folders/<id>?usp=sharing`
/// - `https://drive.google.com/open?id=<id>`
/// - `<id>`
pub fn extract_folder_id(reference: &str) -> Option<String> {
    let reference = reference.trim();

    if let Some(caps) = folders_path().captures(reference) {
        return Some(caps[1].to_string());
    }

    if let Some(caps) = id_param().captures(reference) {
        return Some(caps[1].to_string());
    }

    if raw_id().is_match(reference) {
        return Some(reference.to_string());
    }

    None
}
