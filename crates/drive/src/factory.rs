//! Folder lister factory.
//!
//! Creates a `FolderLister` from the provider name and drive settings.

use crate::client::FolderLister;
use crate::providers::GoogleDriveLister;
use hub_core::{AppError, AppResult, DriveSettings};
use std::sync::Arc;

/// Create a folder lister for `provider`.
///
/// # Arguments
/// * `provider` - Provider identifier ("google-drive", "gdrive", "google")
/// * `settings` - Endpoint, timeout and credential env var names
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or the HTTP client
/// cannot be built.
pub fn create_lister(provider: &str, settings: &DriveSettings) -> AppResult<Arc<dyn FolderLister>> {
    match provider.to_lowercase().as_str() {
        "google-drive" | "gdrive" | "google" => {
            let lister = GoogleDriveLister::new(settings.clone())?;
            Ok(Arc::new(lister))
        }
        _ => Err(AppError::Config(format!(
            "Unknown drive provider: {}",
            provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_google_lister() {
        let lister = create_lister("google-drive", &DriveSettings::default()).unwrap();
        assert_eq!(lister.provider_name(), "google-drive");
    }

    #[test]
    fn test_alias_is_case_insensitive() {
        assert!(create_lister("GDrive", &DriveSettings::default()).is_ok());
    }

    #[test]
    fn test_unknown_provider() {
        match create_lister("dropbox", &DriveSettings::default()) {
            Err(err) => assert!(err.to_string().contains("Unknown drive provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
