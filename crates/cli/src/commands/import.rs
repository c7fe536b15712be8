//! Import command handler.
//!
//! Replaces a subject category with the files of a drive folder.

use super::print_json;
use clap::Args;
use hub_catalog::{load_linker_config, Catalog, DriveImporter, ImportRequest};
use hub_core::{config::HubConfig, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Import a drive folder into a subject category
#[derive(Args, Debug)]
pub struct ImportCommand {
    /// Shared folder URL or raw folder id
    #[arg(short, long)]
    pub folder: String,

    /// Target subject id
    #[arg(short, long)]
    pub subject: i64,

    /// Target category (Explanation, Lectures, Sheets, Midterm, Final, Revision)
    #[arg(short, long)]
    pub category: String,

    /// Drive provider
    #[arg(short, long, env = "HUB_DRIVE_PROVIDER", default_value = "google-drive")]
    pub provider: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ImportCommand {
    pub async fn execute(&self, config: &HubConfig) -> AppResult<()> {
        tracing::info!(
            "Executing import command for subject {} / {}",
            self.subject,
            self.category
        );

        let catalog = Arc::new(Catalog::open(&config.database)?);
        let lister = hub_drive::create_lister(&self.provider, &config.drive)?;
        let importer = DriveImporter::new(catalog, lister)?
            .with_linker_config(load_linker_config(&config.workspace)?)
            .with_timeout(Duration::from_secs(config.drive.timeout_secs));

        let request = ImportRequest::new(&self.folder, self.subject, &self.category);
        let report = importer.import(&request).await?;

        if self.json {
            return print_json(&report);
        }

        println!(
            "Imported {} files ({} solutions linked, {} old resources replaced)",
            report.created_count, report.linked_count, report.deleted_count
        );
        println!("Notified {} students", report.notified_count);

        Ok(())
    }
}
