//! Append-only log of questions the assistant could not answer.
//!
//! Writing is best effort: a failed append never reaches the user.

use crate::text::Language;
use chrono::Local;
use hub_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Timestamp format of the `ts` field.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One logged question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnansweredRecord {
    pub question: String,
    pub ts: String,
    pub lang: String,
}

/// JSON-lines log of unanswered questions.
#[derive(Debug, Clone)]
pub struct UnansweredLog {
    path: PathBuf,
}

impl UnansweredLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a question. Failures are logged at debug level and dropped.
    pub fn record(&self, question: &str, language: Language) {
        let record = UnansweredRecord {
            question: question.to_string(),
            ts: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            lang: language.tag().to_string(),
        };

        if let Err(e) = self.append(&record) {
            tracing::debug!("Could not log unanswered question to {:?}: {}", self.path, e);
        }
    }

    fn append(&self, record: &UnansweredRecord) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let line = serde_json::to_string(record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Read every logged question, oldest first. A missing log is empty.
    pub fn read_all(&self) -> AppResult<Vec<UnansweredRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| {
                    AppError::Serialization(format!("Bad unanswered log line: {}", e))
                })
            })
            .collect()
    }
}
