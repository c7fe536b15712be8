//! Remote drive integration for Study Hub.
//!
//! This crate lists the files of a shared cloud-drive folder behind a
//! provider-agnostic trait, so the importer can be driven by the real
//! Google Drive API or by an in-memory fake.
//!
//! # Example
//! ```no_run
//! use hub_core::DriveSettings;
//! use hub_drive::create_lister;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let lister = create_lister("google-drive", &DriveSettings::default())?;
//! let files = lister
//!     .list_files("https://drive.google.com/drive/folders/abc123")
//!     .await?;
//! println!("{} files", files.len());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod factory;
pub mod folder;
pub mod providers;

// Re-export main types
pub use auth::ServiceAccountKey;
pub use client::{download_url, preview_url, FolderLister, RemoteFile};
pub use factory::create_lister;
pub use folder::extract_folder_id;
pub use providers::{DriveCredentials, GoogleDriveLister};
