//! Folder listing providers.

pub mod google;

pub use google::{DriveCredentials, GoogleDriveLister};
