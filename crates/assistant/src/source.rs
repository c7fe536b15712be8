//! Knowledge base data sources.
//!
//! The engine never reads files itself; it asks a [`KnowledgeSource`] for
//! the full ordered list of entries on load and on every reload.

use crate::types::KnowledgeEntry;
use hub_core::{AppError, AppResult};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Provider of knowledge entries.
pub trait KnowledgeSource: Send + Sync {
    /// Read every entry, in knowledge-base order.
    fn load(&self) -> AppResult<Vec<KnowledgeEntry>>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

/// Supported on-disk formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnowledgeFormat {
    /// A JSON array, or an object wrapping one under `qa`/`entries`
    Json,
    /// One JSON object per line
    JsonLines,
    /// A YAML sequence, or a mapping wrapping one under `qa`/`entries`
    Yaml,
}

impl KnowledgeFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "json" => Some(KnowledgeFormat::Json),
            "jsonl" | "ndjson" => Some(KnowledgeFormat::JsonLines),
            "yaml" | "yml" => Some(KnowledgeFormat::Yaml),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Document {
    List(Vec<KnowledgeEntry>),
    Wrapped {
        #[serde(alias = "entries", alias = "QA_DATA")]
        qa: Vec<KnowledgeEntry>,
    },
}

impl Document {
    fn into_entries(self) -> Vec<KnowledgeEntry> {
        match self {
            Document::List(entries) => entries,
            Document::Wrapped { qa } => qa,
        }
    }
}

/// Parse knowledge entries from `content` in `format`.
pub fn parse_entries(content: &str, format: KnowledgeFormat) -> AppResult<Vec<KnowledgeEntry>> {
    match format {
        KnowledgeFormat::Json => {
            let doc: Document = serde_json::from_str(content)?;
            Ok(doc.into_entries())
        }
        KnowledgeFormat::Yaml => {
            let doc: Document = serde_yaml::from_str(content)?;
            Ok(doc.into_entries())
        }
        KnowledgeFormat::JsonLines => content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str::<KnowledgeEntry>(line).map_err(|e| {
                    AppError::Knowledge(format!("Invalid entry on line {}: {}", n + 1, e))
                })
            })
            .collect(),
    }
}

fn read_file(path: &Path) -> AppResult<Vec<KnowledgeEntry>> {
    let format = KnowledgeFormat::from_path(path).ok_or_else(|| {
        AppError::Knowledge(format!("Unsupported knowledge file format: {:?}", path))
    })?;

    let content = fs::read_to_string(path).map_err(|e| {
        AppError::Knowledge(format!("Failed to read knowledge file {:?}: {}", path, e))
    })?;

    parse_entries(&content, format)
        .map_err(|e| AppError::Knowledge(format!("Failed to parse {:?}: {}", path, e)))
}

/// Knowledge base stored in a single file.
#[derive(Debug, Clone)]
pub struct FileKnowledgeSource {
    path: PathBuf,
}

impl FileKnowledgeSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KnowledgeSource for FileKnowledgeSource {
    fn load(&self) -> AppResult<Vec<KnowledgeEntry>> {
        if !self.path.exists() {
            return Err(AppError::KnowledgeStoreMissing(format!(
                "{:?} does not exist",
                self.path
            )));
        }

        let entries = read_file(&self.path)?;
        tracing::debug!("Read {} entries from {:?}", entries.len(), self.path);
        Ok(entries)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Knowledge base split across the supported files of a directory tree.
///
/// Files are read in sorted path order so the combined order is stable.
#[derive(Debug, Clone)]
pub struct DirectoryKnowledgeSource {
    root: PathBuf,
}

impl DirectoryKnowledgeSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| KnowledgeFormat::from_path(p).is_some())
            .collect();
        files.sort();
        files
    }
}

impl KnowledgeSource for DirectoryKnowledgeSource {
    fn load(&self) -> AppResult<Vec<KnowledgeEntry>> {
        if !self.root.is_dir() {
            return Err(AppError::KnowledgeStoreMissing(format!(
                "{:?} is not a directory",
                self.root
            )));
        }

        let files = self.files();
        if files.is_empty() {
            return Err(AppError::KnowledgeStoreMissing(format!(
                "no knowledge files under {:?}",
                self.root
            )));
        }

        let mut entries = Vec::new();
        for file in files {
            entries.extend(read_file(&file)?);
        }
        Ok(entries)
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }
}

/// In-memory knowledge base.
#[derive(Debug, Clone, Default)]
pub struct StaticKnowledgeSource {
    entries: Vec<KnowledgeEntry>,
}

impl StaticKnowledgeSource {
    pub fn new(entries: Vec<KnowledgeEntry>) -> Self {
        Self { entries }
    }
}

impl KnowledgeSource for StaticKnowledgeSource {
    fn load(&self) -> AppResult<Vec<KnowledgeEntry>> {
        Ok(self.entries.clone())
    }

    fn describe(&self) -> String {
        format!("{} in-memory entries", self.entries.len())
    }
}

/// Open the source at `path`: a directory or a single file.
pub fn open_source(path: &Path) -> Box<dyn KnowledgeSource> {
    if path.is_dir() {
        Box::new(DirectoryKnowledgeSource::new(path))
    } else {
        Box::new(FileKnowledgeSource::new(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_json_array_and_wrapped() {
        let array = r#"[{"question":"q1","answer":"a1"},{"answer":"a2","intent":"fallback"}]"#;
        let entries = parse_entries(array, KnowledgeFormat::Json).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].intent.as_deref(), Some("fallback"));

        let wrapped = r#"{"qa":[{"question":"q1","answer":"a1"}]}"#;
        assert_eq!(parse_entries(wrapped, KnowledgeFormat::Json).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_jsonl_reports_line() {
        let content = "{\"answer\":\"a\"}\n\n{\"question\":\"no answer\"}\n";
        let err = parse_entries(content, KnowledgeFormat::JsonLines).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_parse_yaml() {
        let content = "- question: where are lectures\n  answer: Lectures tab\n  level: 1\n";
        let entries = parse_entries(content, KnowledgeFormat::Yaml).unwrap();
        assert_eq!(entries[0].level.as_deref(), Some("1"));
    }

    #[test]
    fn test_missing_file_is_store_missing() {
        let temp = TempDir::new().unwrap();
        let source = FileKnowledgeSource::new(temp.path().join("qa.json"));
        let err = source.load().unwrap_err();
        assert!(matches!(err, AppError::KnowledgeStoreMissing(_)));
    }

    #[test]
    fn test_directory_source_reads_in_path_order() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("b.json"), r#"[{"question":"second","answer":"2"}]"#).unwrap();
        fs::write(temp.path().join("a.jsonl"), "{\"question\":\"first\",\"answer\":\"1\"}\n").unwrap();
        fs::write(temp.path().join("notes.md"), "ignored").unwrap();

        let entries = DirectoryKnowledgeSource::new(temp.path()).load().unwrap();
        let questions: Vec<_> = entries.iter().filter_map(|e| e.question.as_deref()).collect();
        assert_eq!(questions, vec!["first", "second"]);
    }

    #[test]
    fn test_empty_directory_is_store_missing() {
        let temp = TempDir::new().unwrap();
        let err = DirectoryKnowledgeSource::new(temp.path()).load().unwrap_err();
        assert!(matches!(err, AppError::KnowledgeStoreMissing(_)));
    }
}
