//! Folder listing abstraction and remote file types.
//!
//! This module defines the seam between the importer and whatever service
//! stores the files. The importer only ever sees `RemoteFile` values.

use hub_core::AppResult;
use serde::{Deserialize, Serialize};

/// Preview URL template. `{file_id}` is substituted.
pub const PREVIEW_URL_TEMPLATE: &str = "https://drive.google.com/file/d/{file_id}/preview";

/// Download URL template. `{file_id}` is substituted.
pub const DOWNLOAD_URL_TEMPLATE: &str = "https://drive.google.com/uc?id={file_id}&export=download";

/// A file returned by a folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Drive file id
    pub id: String,

    /// Display name including extension (e.g. "Sheet 1.pdf")
    pub name: String,

    /// Size in bytes as reported by the API (Drive sends it as a string)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// MIME type
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl RemoteFile {
    /// Create a remote file with just an id and a name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            size: None,
            mime_type: None,
        }
    }

    /// Embeddable preview URL for this file.
    pub fn preview_url(&self) -> String {
        preview_url(&self.id)
    }

    /// Direct download URL for this file.
    pub fn download_url(&self) -> String {
        download_url(&self.id)
    }
}

/// Build the preview URL for a file id.
pub fn preview_url(file_id: &str) -> String {
    PREVIEW_URL_TEMPLATE.replace("{file_id}", file_id)
}

/// Build the download URL for a file id.
pub fn download_url(file_id: &str) -> String {
    DOWNLOAD_URL_TEMPLATE.replace("{file_id}", file_id)
}

/// Trait for folder listing providers.
///
/// Implementations return every non-folder, non-trashed file directly inside
/// the referenced folder, in the order the service lists them.
#[async_trait::async_trait]
pub trait FolderLister: Send + Sync {
    /// Get the provider name (e.g., "google-drive").
    fn provider_name(&self) -> &str;

    /// List files in a folder.
    ///
    /// # Arguments
    /// * `folder_reference` - Folder URL or raw folder id
    ///
    /// # Errors
    /// * `AppError::InvalidFolderReference` - reference has no folder id
    /// * `AppError::CredentialsUnavailable` - no credentials configured
    /// * `AppError::Drive` - transport or API failure
    async fn list_files(&self, folder_reference: &str) -> AppResult<Vec<RemoteFile>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_templates() {
        let file = RemoteFile::new("1AbC-_x", "Sheet 1.pdf");
        assert_eq!(
            file.preview_url(),
            "https://drive.google.com/file/d/1AbC-_x/preview"
        );
        assert_eq!(
            file.download_url(),
            "https://drive.google.com/uc?id=1AbC-_x&export=download"
        );
    }

    #[test]
    fn test_remote_file_deserializes_api_shape() {
        let json = r#"{"id":"f1","name":"Lecture 1.pdf","size":"2048","mimeType":"application/pdf"}"#;
        let file: RemoteFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.id, "f1");
        assert_eq!(file.size.as_deref(), Some("2048"));
        assert_eq!(file.mime_type.as_deref(), Some("application/pdf"));
    }
}
