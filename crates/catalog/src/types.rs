//! Catalog types.
//!
//! This module defines the course-material entities: levels, subjects,
//! students, imported resources and notifications.

use chrono::{DateTime, Utc};
use hub_core::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of course material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceCategory {
    Explanation,
    Lectures,
    Sheets,
    Midterm,
    Final,
    Revision,
}

impl ResourceCategory {
    pub const ALL: [ResourceCategory; 6] = [
        ResourceCategory::Explanation,
        ResourceCategory::Lectures,
        ResourceCategory::Sheets,
        ResourceCategory::Midterm,
        ResourceCategory::Final,
        ResourceCategory::Revision,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceCategory::Explanation => "Explanation",
            ResourceCategory::Lectures => "Lectures",
            ResourceCategory::Sheets => "Sheets",
            ResourceCategory::Midterm => "Midterm",
            ResourceCategory::Final => "Final",
            ResourceCategory::Revision => "Revision",
        }
    }
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceCategory {
    type Err = AppError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "Unknown resource category '{}' (expected one of: {})",
                    wanted,
                    Self::ALL.map(|c| c.as_str()).join(", ")
                ))
            })
    }
}

/// Academic level, e.g. "Level 1".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub id: i64,
    pub title: String,
}

/// A subject taught at one level in one semester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub level_id: i64,
    pub semester: u8,
}

/// A student account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub username: String,
    pub level_id: Option<i64>,
}

/// A stored course resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedResource {
    pub id: i64,
    pub subject_id: i64,
    pub category: ResourceCategory,
    pub title: String,
    pub preview_url: String,
    pub download_url: String,
    pub source_folder_url: String,
    pub file_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution_file_id: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// A resource about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResource {
    pub subject_id: i64,
    pub category: ResourceCategory,
    pub title: String,
    pub preview_url: String,
    pub download_url: String,
    pub source_folder_url: String,
    pub file_id: String,
    pub solution_url: Option<String>,
    pub solution_file_id: Option<String>,
}

/// A resource added by hand rather than imported from a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceUpload {
    pub subject_id: i64,
    pub category: ResourceCategory,
    pub title: String,
    pub preview_url: String,
    pub download_url: String,
}

/// Outcome of a manual upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReport {
    pub resource: ImportedResource,
    pub notified_count: usize,
}

/// A private note kept by a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentNote {
    pub id: i64,
    pub student_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A message shown to a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub student_id: i64,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Admin request to import a drive folder into a subject category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRequest {
    /// Folder URL or raw folder id
    pub folder_url: String,

    /// Target subject
    pub subject_id: Option<i64>,

    /// Target category name, e.g. "Sheets"
    pub category: String,
}

impl ImportRequest {
    pub fn new(folder_url: impl Into<String>, subject_id: i64, category: impl Into<String>) -> Self {
        Self {
            folder_url: folder_url.into(),
            subject_id: Some(subject_id),
            category: category.into(),
        }
    }
}

/// Counts produced by linking one listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReport {
    /// Resources removed from the group before import
    pub deleted_count: usize,

    /// Regular plus standalone solution resources created
    pub created_count: usize,

    /// Solutions attached to a parent resource
    pub linked_count: usize,
}

/// Outcome of a completed import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub deleted_count: usize,
    pub created_count: usize,
    pub linked_count: usize,
    pub notified_count: usize,
}

impl ImportReport {
    pub fn from_link(link: LinkReport, notified_count: usize) -> Self {
        Self {
            deleted_count: link.deleted_count,
            created_count: link.created_count,
            linked_count: link.linked_count,
            notified_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_case_insensitive() {
        assert_eq!("sheets".parse::<ResourceCategory>().unwrap(), ResourceCategory::Sheets);
        assert_eq!(" Final ".parse::<ResourceCategory>().unwrap(), ResourceCategory::Final);
    }

    #[test]
    fn test_unknown_category_lists_choices() {
        let err = "Homework".parse::<ResourceCategory>().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("Explanation, Lectures"));
    }

    #[test]
    fn test_category_display_round_trips() {
        for category in ResourceCategory::ALL {
            assert_eq!(category.to_string().parse::<ResourceCategory>().unwrap(), category);
        }
    }
}
