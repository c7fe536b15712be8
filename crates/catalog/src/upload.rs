//! Manual resource upload.
//!
//! An upload adds one resource to a (subject, category) group without
//! touching the rest of the group, then notifies the students of the
//! subject's level. Both happen in one transaction.

use crate::notify::Notifier;
use crate::store::{insert_notification, students_at_level, Catalog, ResourceStore};
use crate::types::{NewResource, ResourceUpload, UploadReport};
use hub_core::{AppError, AppResult};
use rusqlite::Connection;

impl Catalog {
    /// Add one hand-entered resource and notify its level.
    pub fn add_resource(
        &self,
        upload: &ResourceUpload,
        notifier: &Notifier,
    ) -> AppResult<UploadReport> {
        let resource = validate(upload)?;
        let subject = self.subject(upload.subject_id)?.ok_or_else(|| {
            AppError::Validation(format!("Subject {} does not exist", upload.subject_id))
        })?;

        let report = self.with_transaction(|tx| {
            let conn: &Connection = tx;
            let created = conn.create(&resource)?;

            let rendered = notifier.render(1, upload.category, &subject)?;
            let students = students_at_level(conn, subject.level_id)?;
            for student in &students {
                insert_notification(conn, student.id, &rendered.title, &rendered.message)?;
            }

            Ok(UploadReport {
                resource: created,
                notified_count: students.len(),
            })
        })?;

        tracing::info!(
            "Uploaded '{}' to {} / {}, notified {}",
            report.resource.title,
            subject.name,
            upload.category,
            report.notified_count
        );
        Ok(report)
    }
}

fn validate(upload: &ResourceUpload) -> AppResult<NewResource> {
    let title = upload.title.trim();
    let preview_url = upload.preview_url.trim();
    let download_url = upload.download_url.trim();

    let mut missing = Vec::new();
    if title.is_empty() {
        missing.push("title");
    }
    if preview_url.is_empty() {
        missing.push("preview URL");
    }
    if download_url.is_empty() {
        missing.push("download URL");
    }
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "Missing fields for upload: {}",
            missing.join(", ")
        )));
    }

    // Uploaded links have no source folder or drive file
    Ok(NewResource {
        subject_id: upload.subject_id,
        category: upload.category,
        title: title.to_string(),
        preview_url: preview_url.to_string(),
        download_url: download_url.to_string(),
        source_folder_url: String::new(),
        file_id: String::new(),
        solution_url: None,
        solution_file_id: None,
    })
}
