//! Google Drive v3 folder listing provider.
//!
//! Drive API: https://developers.google.com/drive/api/reference/rest/v3/files/list

use crate::auth::{ServiceAccountKey, DRIVE_READONLY_SCOPE};
use crate::client::{FolderLister, RemoteFile};
use crate::folder::extract_folder_id;
use hub_core::{AppError, AppResult, DriveSettings};
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

/// Page size requested from `files.list`.
const PAGE_SIZE: u32 = 1000;

/// Fields requested from `files.list`.
const LIST_FIELDS: &str = "nextPageToken, files(id, name, size, mimeType)";

/// Credentials used to authenticate listing calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveCredentials {
    /// Service account key, exchanged for a bearer token per listing
    ServiceAccount(ServiceAccountKey),
    /// OAuth bearer token (service account or user)
    AccessToken(String),
    /// API key, sufficient for publicly shared folders
    ApiKey(String),
}

impl DriveCredentials {
    /// Resolve credentials from the sources named in `settings`.
    ///
    /// Tried in order: service account JSON in the env var, the service
    /// account key file, a bearer token, an API key. Invalid JSON in the env
    /// var is logged and skipped.
    pub fn from_settings(settings: &DriveSettings) -> AppResult<Self> {
        if let Some(json) = settings.credentials_json() {
            match ServiceAccountKey::from_json(&json) {
                Ok(key) => return Ok(DriveCredentials::ServiceAccount(key)),
                Err(e) => tracing::warn!("Ignoring {}: {}", settings.credentials_json_env, e),
            }
        }

        if settings.credentials_file.is_file() {
            let key = ServiceAccountKey::from_file(&settings.credentials_file)?;
            return Ok(DriveCredentials::ServiceAccount(key));
        }

        if let Some(token) = settings.access_token() {
            return Ok(DriveCredentials::AccessToken(token));
        }

        if let Some(key) = settings.api_key() {
            return Ok(DriveCredentials::ApiKey(key));
        }

        Err(AppError::CredentialsUnavailable(format!(
            "Please set {}, provide {:?}, or set {} or {}",
            settings.credentials_json_env,
            settings.credentials_file,
            settings.access_token_env,
            settings.api_key_env
        )))
    }
}

/// How a single request authenticates.
enum RequestAuth {
    Bearer(String),
    Key(String),
}

/// One page of a `files.list` response.
#[derive(Debug, Deserialize)]
struct FileListPage {
    #[serde(default)]
    files: Vec<RemoteFile>,
    #[serde(rename = "nextPageToken", default)]
    next_page_token: Option<String>,
}

/// Google Drive folder lister.
pub struct GoogleDriveLister {
    /// Drive API settings (endpoint and credential env names)
    settings: DriveSettings,

    /// HTTP client
    client: reqwest::Client,
}

impl GoogleDriveLister {
    /// Create a lister from drive settings.
    ///
    /// Credentials are resolved per call, so a missing key surfaces as a
    /// listing failure rather than a construction failure.
    pub fn new(settings: DriveSettings) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| AppError::Drive(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { settings, client })
    }

    async fn authorize(&self, credentials: DriveCredentials) -> AppResult<RequestAuth> {
        match credentials {
            DriveCredentials::ServiceAccount(key) => key
                .fetch_token(&self.client, DRIVE_READONLY_SCOPE)
                .await
                .map(RequestAuth::Bearer),
            DriveCredentials::AccessToken(token) => Ok(RequestAuth::Bearer(token)),
            DriveCredentials::ApiKey(key) => Ok(RequestAuth::Key(key)),
        }
    }

    /// Build the `q` expression selecting direct, non-folder, live children.
    fn query_for(folder_id: &str) -> String {
        format!(
            "'{}' in parents and mimeType != 'application/vnd.google-apps.folder' and trashed = false",
            folder_id
        )
    }

    async fn fetch_page(
        &self,
        folder_id: &str,
        auth: &RequestAuth,
        page_token: Option<&str>,
    ) -> AppResult<FileListPage> {
        let url = format!("{}/files", self.settings.endpoint.trim_end_matches('/'));
        let page_size = PAGE_SIZE.to_string();

        let mut params: Vec<(&str, String)> = vec![
            ("q", Self::query_for(folder_id)),
            ("pageSize", page_size),
            ("fields", LIST_FIELDS.to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        let mut request = self.client.get(&url);
        match auth {
            RequestAuth::Bearer(token) => request = request.bearer_auth(token),
            RequestAuth::Key(key) => params.push(("key", key.clone())),
        }

        let response = request
            .query(&params)
            .send()
            .await
            .map_err(|e| AppError::Drive(format!("Failed to reach Drive API: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Drive(format!(
                "Drive API error ({}): {}",
                status, error_text
            )));
        }

        response
            .json::<FileListPage>()
            .await
            .map_err(|e| AppError::Drive(format!("Failed to parse Drive response: {}", e)))
    }
}

#[async_trait::async_trait]
impl FolderLister for GoogleDriveLister {
    fn provider_name(&self) -> &str {
        "google-drive"
    }

    #[instrument(skip(self))]
    async fn list_files(&self, folder_reference: &str) -> AppResult<Vec<RemoteFile>> {
        if folder_reference.trim().is_empty() {
            return Ok(Vec::new());
        }

        let folder_id = extract_folder_id(folder_reference)
            .ok_or_else(|| AppError::InvalidFolderReference(folder_reference.to_string()))?;

        let auth = self
            .authorize(DriveCredentials::from_settings(&self.settings)?)
            .await?;

        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .fetch_page(&folder_id, &auth, page_token.as_deref())
                .await?;
            tracing::debug!("Drive page returned {} files", page.files.len());
            files.extend(page.files);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::info!("Listed {} files in folder {}", files.len(), folder_id);
        Ok(files)
    }
}
