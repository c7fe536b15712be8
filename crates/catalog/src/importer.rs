//! Drive folder import.
//!
//! An import replaces every resource of one (subject, category) group with
//! the files of a drive folder and notifies the students of the subject's
//! level. Imports of the same group are serialized, and everything after
//! the listing commits or rolls back as one transaction.

use crate::linker::{self, ImportTarget, LinkerConfig};
use crate::notify::{NotificationTemplates, Notifier};
use crate::store::{insert_notification, students_at_level, Catalog};
use crate::types::{ImportReport, ImportRequest, ResourceCategory, Subject};
use hub_core::{AppError, AppResult};
use hub_drive::{FolderLister, RemoteFile};
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Default listing timeout.
pub const DEFAULT_LISTING_TIMEOUT: Duration = Duration::from_secs(30);

type GroupKey = (i64, ResourceCategory);

/// Imports drive folders into the catalog.
pub struct DriveImporter {
    catalog: Arc<Catalog>,
    lister: Arc<dyn FolderLister>,
    linker: LinkerConfig,
    notifier: Notifier,
    listing_timeout: Duration,
    locks: Mutex<HashMap<GroupKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl DriveImporter {
    pub fn new(catalog: Arc<Catalog>, lister: Arc<dyn FolderLister>) -> AppResult<Self> {
        Ok(Self {
            catalog,
            lister,
            linker: LinkerConfig::default(),
            notifier: Notifier::new(&NotificationTemplates::default())?,
            listing_timeout: DEFAULT_LISTING_TIMEOUT,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn with_linker_config(mut self, config: LinkerConfig) -> Self {
        self.linker = config;
        self
    }

    pub fn with_templates(mut self, templates: &NotificationTemplates) -> AppResult<Self> {
        self.notifier = Notifier::new(templates)?;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.listing_timeout = timeout;
        self
    }

    /// Run one import.
    ///
    /// Validation failures and listing failures leave the catalog untouched.
    pub async fn import(&self, request: &ImportRequest) -> AppResult<ImportReport> {
        let (subject, category, folder_url) = self.validate(request)?;

        let lock = self.group_lock((subject.id, category))?;
        let _guard = lock.lock().await;

        tracing::info!(
            "Importing {} into {} / {} via {}",
            folder_url,
            subject.name,
            category,
            self.lister.provider_name()
        );

        let files = self.list(&folder_url).await?;
        let plan = linker::plan(&files, &self.linker);
        let target = ImportTarget {
            subject_id: subject.id,
            category,
            folder_url,
        };

        let report = self.catalog.with_transaction(|tx| {
            let conn: &Connection = tx;
            let link = linker::apply(conn, &target, &plan)?;

            let rendered = self.notifier.render(link.created_count, category, &subject)?;
            let students = students_at_level(conn, subject.level_id)?;
            for student in &students {
                insert_notification(conn, student.id, &rendered.title, &rendered.message)?;
            }

            Ok(ImportReport::from_link(link, students.len()))
        })?;

        tracing::info!(
            "Import complete: cleared {}, created {}, linked {}, notified {}",
            report.deleted_count,
            report.created_count,
            report.linked_count,
            report.notified_count
        );
        Ok(report)
    }

    fn validate(&self, request: &ImportRequest) -> AppResult<(Subject, ResourceCategory, String)> {
        let folder_url = request.folder_url.trim();
        let category = request.category.trim();

        let mut missing = Vec::new();
        if folder_url.is_empty() {
            missing.push("folder URL");
        }
        if request.subject_id.is_none() {
            missing.push("subject id");
        }
        if category.is_empty() {
            missing.push("category");
        }
        let subject_id = match request.subject_id {
            Some(id) if missing.is_empty() => id,
            _ => {
                return Err(AppError::Validation(format!(
                    "Missing fields for drive import: {}",
                    missing.join(", ")
                )))
            }
        };

        let category: ResourceCategory = category.parse()?;
        let subject = self
            .catalog
            .subject(subject_id)?
            .ok_or_else(|| AppError::Validation(format!("Subject {} does not exist", subject_id)))?;

        Ok((subject, category, folder_url.to_string()))
    }

    fn group_lock(&self, key: GroupKey) -> AppResult<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| AppError::Other("Import lock table poisoned".to_string()))?;
        Ok(Arc::clone(locks.entry(key).or_default()))
    }

    async fn list(&self, folder_url: &str) -> AppResult<Vec<RemoteFile>> {
        match tokio::time::timeout(self.listing_timeout, self.lister.list_files(folder_url)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Drive(format!(
                "Listing {} timed out after {:?}",
                folder_url, self.listing_timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeLister {
        files: Vec<RemoteFile>,
        fail: bool,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl FakeLister {
        fn with(names: &[&str]) -> Self {
            Self {
                files: names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| RemoteFile::new(format!("f{}", i), *name))
                    .collect(),
                fail: false,
                delay: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::with(&[])
            }
        }
    }

    #[async_trait::async_trait]
    impl FolderLister for FakeLister {
        fn provider_name(&self) -> &str {
            "fake"
        }

        async fn list_files(&self, _folder_reference: &str) -> AppResult<Vec<RemoteFile>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(AppError::CredentialsUnavailable("no token".to_string()));
            }
            Ok(self.files.clone())
        }
    }

    struct Fixture {
        catalog: Arc<Catalog>,
        subject: Subject,
        student_ids: Vec<i64>,
    }

    fn fixture() -> Fixture {
        let catalog = Arc::new(Catalog::in_memory().unwrap());
        let level = catalog.add_level("Level 1").unwrap();
        let other = catalog.add_level("Level 2").unwrap();
        let subject = catalog.add_subject("Physics", level.id, 1).unwrap();
        let a = catalog.add_student("amr", Some(level.id)).unwrap();
        let b = catalog.add_student("mona", Some(level.id)).unwrap();
        catalog.add_student("omar", Some(other.id)).unwrap();
        Fixture {
            catalog,
            subject,
            student_ids: vec![a.id, b.id],
        }
    }

    fn importer(fx: &Fixture, lister: Arc<FakeLister>) -> DriveImporter {
        DriveImporter::new(Arc::clone(&fx.catalog), lister).unwrap()
    }

    fn request(fx: &Fixture) -> ImportRequest {
        ImportRequest::new("https://drive.google.com/drive/folders/abc", fx.subject.id, "Sheets")
    }

    #[tokio::test]
    async fn test_import_links_and_notifies() {
        let fx = fixture();
        let lister = Arc::new(FakeLister::with(&[
            "Sheet 1.pdf",
            "Sheet 1 Solution.pdf",
            "Sheet 2.pdf",
        ]));
        let report = importer(&fx, lister).import(&request(&fx)).await.unwrap();

        assert_eq!(
            report,
            ImportReport {
                deleted_count: 0,
                created_count: 2,
                linked_count: 1,
                notified_count: 2,
            }
        );

        let stored = fx.catalog.resources(fx.subject.id, ResourceCategory::Sheets).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].title, "Sheet 1");
        assert_eq!(stored[0].solution_file_id.as_deref(), Some("f1"));
        assert_eq!(
            stored[0].solution_url.as_deref(),
            Some("https://drive.google.com/uc?id=f1&export=download")
        );
        assert!(stored[1].solution_url.is_none());
        assert_eq!(stored[1].source_folder_url, "https://drive.google.com/drive/folders/abc");

        for id in &fx.student_ids {
            let notes = fx.catalog.notifications(*id).unwrap();
            assert_eq!(notes.len(), 1);
            assert_eq!(notes[0].title, "New Resources Imported");
            assert_eq!(notes[0].message, "2 new Sheets files have been added for Physics.");
        }
    }

    #[tokio::test]
    async fn test_reimport_with_empty_folder_clears_group() {
        let fx = fixture();
        let first = Arc::new(FakeLister::with(&["Lecture 1.pdf", "Lecture 2.pdf", "Lecture 3.pdf"]));
        importer(&fx, first).import(&request(&fx)).await.unwrap();

        let empty = Arc::new(FakeLister::with(&[]));
        let report = importer(&fx, empty).import(&request(&fx)).await.unwrap();

        assert_eq!(report.deleted_count, 3);
        assert_eq!(report.created_count, 0);
        assert!(fx
            .catalog
            .resources(fx.subject.id, ResourceCategory::Sheets)
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_validation_failure_touches_nothing() {
        let fx = fixture();
        let lister = Arc::new(FakeLister::with(&["Sheet 1.pdf"]));
        let importer = importer(&fx, Arc::clone(&lister));

        let missing = ImportRequest {
            folder_url: " ".to_string(),
            subject_id: None,
            category: "Sheets".to_string(),
        };
        let err = importer.import(&missing).await.unwrap_err();
        assert!(err.to_string().contains("folder URL, subject id"));

        let bad_category = ImportRequest::new("abc", fx.subject.id, "Homework");
        assert!(matches!(
            importer.import(&bad_category).await,
            Err(AppError::Validation(_))
        ));

        let unknown_subject = ImportRequest::new("abc", 999, "Sheets");
        assert!(matches!(
            importer.import(&unknown_subject).await,
            Err(AppError::Validation(_))
        ));

        assert_eq!(lister.calls.load(Ordering::SeqCst), 0);
        assert!(fx.catalog.notifications(fx.student_ids[0]).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listing_failure_keeps_previous_resources() {
        let fx = fixture();
        let first = Arc::new(FakeLister::with(&["Sheet 1.pdf", "Sheet 2.pdf"]));
        importer(&fx, first).import(&request(&fx)).await.unwrap();

        let err = importer(&fx, Arc::new(FakeLister::failing()))
            .import(&request(&fx))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CredentialsUnavailable(_)));
        assert_eq!(
            fx.catalog.resources(fx.subject.id, ResourceCategory::Sheets).unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn test_listing_timeout_is_a_failure() {
        let fx = fixture();
        let slow = Arc::new(FakeLister {
            delay: Some(Duration::from_secs(5)),
            ..FakeLister::with(&["Sheet 1.pdf"])
        });
        let importer = importer(&fx, slow).with_timeout(Duration::from_millis(20));

        let err = importer.import(&request(&fx)).await.unwrap_err();
        assert!(matches!(err, AppError::Drive(_)));
        assert!(fx
            .catalog
            .resources(fx.subject.id, ResourceCategory::Sheets)
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_imports_of_one_group_do_not_mix() {
        let fx = fixture();
        let lister = Arc::new(FakeLister {
            delay: Some(Duration::from_millis(10)),
            ..FakeLister::with(&["Sheet 1.pdf", "Sheet 2.pdf"])
        });
        let importer = importer(&fx, lister);
        let req = request(&fx);

        let (a, b) = tokio::join!(importer.import(&req), importer.import(&req));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.deleted_count + b.deleted_count, 2);
        assert_eq!(
            fx.catalog.resources(fx.subject.id, ResourceCategory::Sheets).unwrap().len(),
            2
        );
    }
}
