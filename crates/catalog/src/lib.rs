//! Course material catalog for Study Hub.
//!
//! This crate provides:
//! - SQLite storage for levels, subjects, students, resources, notes and notifications
//! - Drive folder import with solution-to-sheet linking
//! - Manual resource upload
//! - Handlebars-rendered import and upload notifications
//! - Live support chat between students and staff

pub mod importer;
pub mod linker;
pub mod notify;
pub mod store;
pub mod support;
pub mod types;
pub mod upload;


// Re-export main types
pub use importer::DriveImporter;
pub use linker::{load_linker_config, LinkerConfig};
pub use notify::{NotificationTemplates, Notifier};
pub use store::{Catalog, ResourceStore};
pub use support::{Requester, Sender, SupportDesk};
pub use types::{
    ImportReport, ImportRequest, ImportedResource, Level, LinkReport, NewResource, Notification,
    ResourceCategory, ResourceUpload, Student, StudentNote, Subject, UploadReport,
};
