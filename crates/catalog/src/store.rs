//! SQLite-backed catalog storage.
//!
//! One database holds levels, subjects, students, resources, notes,
//! notifications and support chat. Multi-statement writes go through
//! [`Catalog::with_transaction`].

use crate::types::{
    ImportedResource, Level, NewResource, Notification, ResourceCategory, Student, StudentNote,
    Subject,
};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use hub_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS levels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subjects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    level_id INTEGER NOT NULL,
    semester INTEGER NOT NULL CHECK (semester IN (1, 2)),
    FOREIGN KEY (level_id) REFERENCES levels(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS students (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    level_id INTEGER,
    FOREIGN KEY (level_id) REFERENCES levels(id) ON DELETE SET NULL
);

CREATE TABLE IF NOT EXISTS resources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    subject_id INTEGER NOT NULL,
    category TEXT NOT NULL,
    title TEXT NOT NULL,
    preview_url TEXT NOT NULL,
    download_url TEXT NOT NULL,
    source_folder_url TEXT NOT NULL,
    file_id TEXT NOT NULL,
    solution_url TEXT,
    solution_file_id TEXT,
    uploaded_at TEXT NOT NULL,
    FOREIGN KEY (subject_id) REFERENCES subjects(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    is_read INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    FOREIGN KEY (student_id) REFERENCES students(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (student_id) REFERENCES students(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS support_sessions (
    token TEXT PRIMARY KEY,
    user TEXT,
    guest_name TEXT,
    guest_email TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS support_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_token TEXT NOT NULL,
    sender TEXT NOT NULL,
    message TEXT NOT NULL,
    file_url TEXT,
    is_read INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    FOREIGN KEY (session_token) REFERENCES support_sessions(token) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_resources_group ON resources(subject_id, category);
CREATE INDEX IF NOT EXISTS idx_notifications_student ON notifications(student_id);
CREATE INDEX IF NOT EXISTS idx_notes_student ON notes(student_id);
CREATE INDEX IF NOT EXISTS idx_support_messages_session ON support_messages(session_token);
"#;

pub(crate) fn storage_error(context: &str) -> impl Fn(rusqlite::Error) -> AppError + '_ {
    move |e| AppError::Storage(format!("{}: {}", context, e))
}

/// Current time at the precision stored in the database.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 so text order equals time order.
pub(crate) fn stamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_time(raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_category(raw: String) -> rusqlite::Result<ResourceCategory> {
    raw.parse().map_err(|e: AppError| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })
}

const RESOURCE_COLUMNS: &str = "id, subject_id, category, title, preview_url, download_url, \
     source_folder_url, file_id, solution_url, solution_file_id, uploaded_at";

fn resource_from_row(row: &Row<'_>) -> rusqlite::Result<ImportedResource> {
    Ok(ImportedResource {
        id: row.get(0)?,
        subject_id: row.get(1)?,
        category: parse_category(row.get(2)?)?,
        title: row.get(3)?,
        preview_url: row.get(4)?,
        download_url: row.get(5)?,
        source_folder_url: row.get(6)?,
        file_id: row.get(7)?,
        solution_url: row.get(8)?,
        solution_file_id: row.get(9)?,
        uploaded_at: parse_time(row.get(10)?)?,
    })
}

fn subject_from_row(row: &Row<'_>) -> rusqlite::Result<Subject> {
    Ok(Subject {
        id: row.get(0)?,
        name: row.get(1)?,
        level_id: row.get(2)?,
        semester: row.get(3)?,
    })
}

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        student_id: row.get(1)?,
        title: row.get(2)?,
        message: row.get(3)?,
        is_read: row.get(4)?,
        created_at: parse_time(row.get(5)?)?,
    })
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<StudentNote> {
    Ok(StudentNote {
        id: row.get(0)?,
        student_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        created_at: parse_time(row.get(4)?)?,
    })
}

/// Title given to a note saved without one.
pub const DEFAULT_NOTE_TITLE: &str = "Note";

/// Most subjects a search returns.
pub const SUBJECT_SEARCH_LIMIT: usize = 20;

/// Resource persistence used by the linker.
pub trait ResourceStore {
    /// Delete every resource of a (subject, category) group.
    fn delete_where(&self, subject_id: i64, category: ResourceCategory) -> AppResult<usize>;

    /// Persist a new resource.
    fn create(&self, resource: &NewResource) -> AppResult<ImportedResource>;

    /// Save changes to an existing resource.
    fn update(&self, resource: &ImportedResource) -> AppResult<()>;
}

impl ResourceStore for Connection {
    fn delete_where(&self, subject_id: i64, category: ResourceCategory) -> AppResult<usize> {
        self.execute(
            "DELETE FROM resources WHERE subject_id = ?1 AND category = ?2",
            params![subject_id, category.as_str()],
        )
        .map_err(storage_error("Failed to delete resources"))
    }

    fn create(&self, resource: &NewResource) -> AppResult<ImportedResource> {
        let uploaded_at = now();
        self.execute(
            "INSERT INTO resources (subject_id, category, title, preview_url, download_url,
                 source_folder_url, file_id, solution_url, solution_file_id, uploaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                resource.subject_id,
                resource.category.as_str(),
                resource.title,
                resource.preview_url,
                resource.download_url,
                resource.source_folder_url,
                resource.file_id,
                resource.solution_url,
                resource.solution_file_id,
                stamp(&uploaded_at),
            ],
        )
        .map_err(storage_error("Failed to create resource"))?;

        Ok(ImportedResource {
            id: self.last_insert_rowid(),
            subject_id: resource.subject_id,
            category: resource.category,
            title: resource.title.clone(),
            preview_url: resource.preview_url.clone(),
            download_url: resource.download_url.clone(),
            source_folder_url: resource.source_folder_url.clone(),
            file_id: resource.file_id.clone(),
            solution_url: resource.solution_url.clone(),
            solution_file_id: resource.solution_file_id.clone(),
            uploaded_at,
        })
    }

    fn update(&self, resource: &ImportedResource) -> AppResult<()> {
        let changed = self
            .execute(
                "UPDATE resources SET title = ?2, preview_url = ?3, download_url = ?4,
                     solution_url = ?5, solution_file_id = ?6
                 WHERE id = ?1",
                params![
                    resource.id,
                    resource.title,
                    resource.preview_url,
                    resource.download_url,
                    resource.solution_url,
                    resource.solution_file_id,
                ],
            )
            .map_err(storage_error("Failed to update resource"))?;

        if changed == 0 {
            return Err(AppError::Storage(format!(
                "Resource {} does not exist",
                resource.id
            )));
        }
        Ok(())
    }
}

/// Students whose level is `level_id`.
pub fn students_at_level(conn: &Connection, level_id: i64) -> AppResult<Vec<Student>> {
    let mut stmt = conn
        .prepare("SELECT id, username, level_id FROM students WHERE level_id = ?1 ORDER BY id")
        .map_err(storage_error("Failed to prepare student query"))?;
    let rows = stmt
        .query_map([level_id], |row| {
            Ok(Student {
                id: row.get(0)?,
                username: row.get(1)?,
                level_id: row.get(2)?,
            })
        })
        .map_err(storage_error("Failed to query students"))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(storage_error("Failed to read student"))
}

/// Add an unread notification for a student.
pub fn insert_notification(
    conn: &Connection,
    student_id: i64,
    title: &str,
    message: &str,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO notifications (student_id, title, message, is_read, created_at)
         VALUES (?1, ?2, ?3, 0, ?4)",
        params![student_id, title, message, stamp(&now())],
    )
    .map_err(storage_error("Failed to create notification"))?;
    Ok(conn.last_insert_rowid())
}

/// Catalog database.
pub struct Catalog {
    conn: Mutex<Connection>,
}

impl Catalog {
    /// Open (or create) the catalog at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::Storage(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        let conn = Connection::open(db_path).map_err(storage_error("Failed to open catalog"))?;
        let catalog = Self::init(conn)?;
        tracing::debug!("Opened catalog at {:?}", db_path);
        Ok(catalog)
    }

    /// Catalog that lives only as long as the value.
    pub fn in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory().map_err(storage_error("Failed to open catalog"))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(storage_error("Failed to enable foreign keys"))?;
        conn.execute_batch(SCHEMA)
            .map_err(storage_error("Failed to create catalog tables"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Storage("Catalog lock poisoned".to_string()))
    }

    /// Run `f` with the connection.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> AppResult<T>) -> AppResult<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` in one transaction. Any error rolls everything back.
    pub fn with_transaction<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> AppResult<T>,
    ) -> AppResult<T> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(storage_error("Failed to begin transaction"))?;
        let value = f(&tx)?;
        tx.commit().map_err(storage_error("Failed to commit transaction"))?;
        Ok(value)
    }

    pub fn add_level(&self, title: &str) -> AppResult<Level> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Level title is required".to_string()));
        }
        self.with_conn(|conn| {
            conn.execute("INSERT INTO levels (title) VALUES (?1)", [title])
                .map_err(storage_error("Failed to create level"))?;
            Ok(Level {
                id: conn.last_insert_rowid(),
                title: title.to_string(),
            })
        })
    }

    pub fn levels(&self) -> AppResult<Vec<Level>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, title FROM levels ORDER BY id")
                .map_err(storage_error("Failed to prepare level query"))?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(Level {
                        id: row.get(0)?,
                        title: row.get(1)?,
                    })
                })
                .map_err(storage_error("Failed to query levels"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(storage_error("Failed to read level"))
        })
    }

    fn level_exists(conn: &Connection, level_id: i64) -> AppResult<bool> {
        conn.query_row("SELECT 1 FROM levels WHERE id = ?1", [level_id], |_| Ok(()))
            .optional()
            .map(|found| found.is_some())
            .map_err(storage_error("Failed to look up level"))
    }

    pub fn add_subject(&self, name: &str, level_id: i64, semester: u8) -> AppResult<Subject> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Subject name is required".to_string()));
        }
        if !(1..=2).contains(&semester) {
            return Err(AppError::Validation(format!(
                "Semester must be 1 or 2, got {}",
                semester
            )));
        }

        self.with_conn(|conn| {
            if !Self::level_exists(conn, level_id)? {
                return Err(AppError::Validation(format!("Level {} does not exist", level_id)));
            }
            conn.execute(
                "INSERT INTO subjects (name, level_id, semester) VALUES (?1, ?2, ?3)",
                params![name, level_id, semester],
            )
            .map_err(storage_error("Failed to create subject"))?;
            Ok(Subject {
                id: conn.last_insert_rowid(),
                name: name.to_string(),
                level_id,
                semester,
            })
        })
    }

    pub fn subject(&self, id: i64) -> AppResult<Option<Subject>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, level_id, semester FROM subjects WHERE id = ?1",
                [id],
                subject_from_row,
            )
            .optional()
            .map_err(storage_error("Failed to load subject"))
        })
    }

    /// Subjects, optionally only those of one level, ordered by name.
    pub fn subjects(&self, level_id: Option<i64>) -> AppResult<Vec<Subject>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, name, level_id, semester FROM subjects
                     WHERE ?1 IS NULL OR level_id = ?1 ORDER BY name, id",
                )
                .map_err(storage_error("Failed to prepare subject query"))?;
            let rows = stmt
                .query_map([level_id], subject_from_row)
                .map_err(storage_error("Failed to query subjects"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(storage_error("Failed to read subject"))
        })
    }

    /// Subjects whose name contains `query`, ignoring ASCII case.
    ///
    /// An empty query matches every subject. Results are ordered by level,
    /// then name, and capped at [`SUBJECT_SEARCH_LIMIT`].
    pub fn search_subjects(
        &self,
        query: &str,
        level_id: Option<i64>,
        semester: Option<u8>,
    ) -> AppResult<Vec<Subject>> {
        let query = query.trim();
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, name, level_id, semester FROM subjects
                     WHERE (?1 = '' OR instr(lower(name), lower(?1)) > 0)
                       AND (?2 IS NULL OR level_id = ?2)
                       AND (?3 IS NULL OR semester = ?3)
                     ORDER BY level_id, name, id
                     LIMIT ?4",
                )
                .map_err(storage_error("Failed to prepare subject search"))?;
            let rows = stmt
                .query_map(
                    params![query, level_id, semester, SUBJECT_SEARCH_LIMIT as i64],
                    subject_from_row,
                )
                .map_err(storage_error("Failed to search subjects"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(storage_error("Failed to read subject"))
        })
    }

    pub fn add_student(&self, username: &str, level_id: Option<i64>) -> AppResult<Student> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::Validation("Username is required".to_string()));
        }

        self.with_conn(|conn| {
            if let Some(level_id) = level_id {
                if !Self::level_exists(conn, level_id)? {
                    return Err(AppError::Validation(format!(
                        "Level {} does not exist",
                        level_id
                    )));
                }
            }
            conn.execute(
                "INSERT INTO students (username, level_id) VALUES (?1, ?2)",
                params![username, level_id],
            )
            .map_err(storage_error("Failed to create student"))?;
            Ok(Student {
                id: conn.last_insert_rowid(),
                username: username.to_string(),
                level_id,
            })
        })
    }

    pub fn student_by_name(&self, username: &str) -> AppResult<Option<Student>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, username, level_id FROM students WHERE username = ?1",
                [username],
                |row| {
                    Ok(Student {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        level_id: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(storage_error("Failed to load student"))
        })
    }

    /// Resources of a (subject, category) group in creation order.
    pub fn resources(
        &self,
        subject_id: i64,
        category: ResourceCategory,
    ) -> AppResult<Vec<ImportedResource>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM resources WHERE subject_id = ?1 AND category = ?2 ORDER BY id",
                RESOURCE_COLUMNS
            );
            let mut stmt = conn
                .prepare(&sql)
                .map_err(storage_error("Failed to prepare resource query"))?;
            let rows = stmt
                .query_map(params![subject_id, category.as_str()], resource_from_row)
                .map_err(storage_error("Failed to query resources"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(storage_error("Failed to read resource"))
        })
    }

    pub fn delete_resource(&self, id: i64) -> AppResult<bool> {
        self.with_conn(|conn| {
            let deleted = conn
                .execute("DELETE FROM resources WHERE id = ?1", [id])
                .map_err(storage_error("Failed to delete resource"))?;
            Ok(deleted > 0)
        })
    }

    /// Save a note for a student. A blank title becomes [`DEFAULT_NOTE_TITLE`].
    pub fn add_note(&self, student_id: i64, title: &str, content: &str) -> AppResult<StudentNote> {
        if content.trim().is_empty() {
            return Err(AppError::Validation("Note content is required".to_string()));
        }
        let title = match title.trim() {
            "" => DEFAULT_NOTE_TITLE,
            title => title,
        };

        let created_at = now();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notes (student_id, title, content, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![student_id, title, content, stamp(&created_at)],
            )
            .map_err(storage_error("Failed to create note"))?;
            Ok(StudentNote {
                id: conn.last_insert_rowid(),
                student_id,
                title: title.to_string(),
                content: content.to_string(),
                created_at,
            })
        })
    }

    /// Notes of a student, newest first.
    pub fn notes(&self, student_id: i64) -> AppResult<Vec<StudentNote>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, student_id, title, content, created_at
                     FROM notes WHERE student_id = ?1
                     ORDER BY created_at DESC, id DESC",
                )
                .map_err(storage_error("Failed to prepare note query"))?;
            let rows = stmt
                .query_map([student_id], note_from_row)
                .map_err(storage_error("Failed to query notes"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(storage_error("Failed to read note"))
        })
    }

    /// Delete a note owned by `student_id`. Returns false when the note does
    /// not exist or belongs to someone else.
    pub fn delete_note(&self, student_id: i64, note_id: i64) -> AppResult<bool> {
        self.with_conn(|conn| {
            let deleted = conn
                .execute(
                    "DELETE FROM notes WHERE id = ?1 AND student_id = ?2",
                    params![note_id, student_id],
                )
                .map_err(storage_error("Failed to delete note"))?;
            Ok(deleted > 0)
        })
    }

    /// Notifications of a student, newest first.
    pub fn notifications(&self, student_id: i64) -> AppResult<Vec<Notification>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, student_id, title, message, is_read, created_at
                     FROM notifications WHERE student_id = ?1
                     ORDER BY created_at DESC, id DESC",
                )
                .map_err(storage_error("Failed to prepare notification query"))?;
            let rows = stmt
                .query_map([student_id], notification_from_row)
                .map_err(storage_error("Failed to query notifications"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(storage_error("Failed to read notification"))
        })
    }

    pub fn unread_count(&self, student_id: i64) -> AppResult<usize> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE student_id = ?1 AND is_read = 0",
                [student_id],
                |row| row.get::<_, i64>(0).map(|n| n as usize),
            )
            .map_err(storage_error("Failed to count notifications"))
        })
    }

    /// Mark every unread notification of a student read.
    pub fn mark_notifications_read(&self, student_id: i64) -> AppResult<usize> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE student_id = ?1 AND is_read = 0",
                [student_id],
            )
            .map_err(storage_error("Failed to mark notifications read"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn new_resource(subject_id: i64, title: &str) -> NewResource {
        NewResource {
            subject_id,
            category: ResourceCategory::Sheets,
            title: title.to_string(),
            preview_url: format!("https://example.test/{}/preview", title),
            download_url: format!("https://example.test/{}/download", title),
            source_folder_url: "folder".to_string(),
            file_id: title.to_string(),
            solution_url: None,
            solution_file_id: None,
        }
    }

    fn seeded() -> (Catalog, Subject) {
        let catalog = Catalog::in_memory().unwrap();
        let level = catalog.add_level("Level 1").unwrap();
        let subject = catalog.add_subject("Physics", level.id, 1).unwrap();
        (catalog, subject)
    }

    #[test]
    fn test_init_creates_tables() {
        let temp_file = NamedTempFile::new().unwrap();
        let catalog = Catalog::open(temp_file.path()).unwrap();

        let table_count: i64 = catalog
            .with_conn(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table'",
                    [],
                    |row| row.get(0),
                )
                .map_err(storage_error("count"))
            })
            .unwrap();
        assert!(table_count >= 7);
    }

    #[test]
    fn test_subject_validation() {
        let catalog = Catalog::in_memory().unwrap();
        assert!(matches!(
            catalog.add_subject("Physics", 99, 1),
            Err(AppError::Validation(_))
        ));
        let level = catalog.add_level("Level 1").unwrap();
        assert!(matches!(
            catalog.add_subject("Physics", level.id, 3),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_resource_store_round_trip() {
        let (catalog, subject) = seeded();
        catalog
            .with_transaction(|tx| {
                let mut created = tx.create(&new_resource(subject.id, "Sheet 1"))?;
                tx.create(&new_resource(subject.id, "Sheet 2"))?;
                created.solution_url = Some("https://example.test/sol".to_string());
                created.solution_file_id = Some("sol".to_string());
                tx.update(&created)
            })
            .unwrap();

        let stored = catalog.resources(subject.id, ResourceCategory::Sheets).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].solution_file_id.as_deref(), Some("sol"));
        assert!(catalog.resources(subject.id, ResourceCategory::Final).unwrap().is_empty());

        let deleted = catalog
            .with_conn(|conn| conn.delete_where(subject.id, ResourceCategory::Sheets))
            .unwrap();
        assert_eq!(deleted, 2);
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let (catalog, subject) = seeded();
        let result: AppResult<()> = catalog.with_transaction(|tx| {
            tx.create(&new_resource(subject.id, "Sheet 1"))?;
            Err(AppError::Drive("listing failed".to_string()))
        });
        assert!(result.is_err());
        assert!(catalog.resources(subject.id, ResourceCategory::Sheets).unwrap().is_empty());
    }

    #[test]
    fn test_notifications_read_flow() {
        let (catalog, subject) = seeded();
        let student = catalog.add_student("mona", Some(subject.level_id)).unwrap();
        catalog
            .with_conn(|conn| insert_notification(conn, student.id, "Hello", "First"))
            .unwrap();
        catalog
            .with_conn(|conn| insert_notification(conn, student.id, "Hello", "Second"))
            .unwrap();

        assert_eq!(catalog.unread_count(student.id).unwrap(), 2);
        let listed = catalog.notifications(student.id).unwrap();
        assert_eq!(listed[0].message, "Second");

        assert_eq!(catalog.mark_notifications_read(student.id).unwrap(), 2);
        assert_eq!(catalog.unread_count(student.id).unwrap(), 0);
    }

    #[test]
    fn test_notes_newest_first_and_owner_only_delete() {
        let (catalog, subject) = seeded();
        let mona = catalog.add_student("mona", Some(subject.level_id)).unwrap();
        let omar = catalog.add_student("omar", Some(subject.level_id)).unwrap();

        let first = catalog.add_note(mona.id, "  ", "Revise chapter 2").unwrap();
        assert_eq!(first.title, DEFAULT_NOTE_TITLE);
        catalog.add_note(mona.id, "Lab", "Bring calculator").unwrap();

        let listed = catalog.notes(mona.id).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].title, "Lab");

        assert!(!catalog.delete_note(omar.id, first.id).unwrap());
        assert!(catalog.delete_note(mona.id, first.id).unwrap());
        assert_eq!(catalog.notes(mona.id).unwrap().len(), 1);
    }

    #[test]
    fn test_note_requires_content() {
        let (catalog, subject) = seeded();
        let mona = catalog.add_student("mona", Some(subject.level_id)).unwrap();
        assert!(matches!(
            catalog.add_note(mona.id, "Empty", " \n"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_search_subjects_filters_and_orders() {
        let (catalog, physics) = seeded();
        let level_two = catalog.add_level("Level 2").unwrap();
        catalog.add_subject("Applied Physics", level_two.id, 2).unwrap();
        catalog.add_subject("Astrophysics", physics.level_id, 2).unwrap();
        catalog.add_subject("Chemistry", physics.level_id, 1).unwrap();

        let names = |found: Vec<Subject>| found.into_iter().map(|s| s.name).collect::<Vec<_>>();

        assert_eq!(
            names(catalog.search_subjects("PHYSICS", None, None).unwrap()),
            vec!["Astrophysics", "Physics", "Applied Physics"]
        );
        assert_eq!(
            names(catalog.search_subjects("physics", Some(physics.level_id), Some(1)).unwrap()),
            vec!["Physics"]
        );
        assert_eq!(catalog.search_subjects("", None, None).unwrap().len(), 4);
    }

    #[test]
    fn test_search_subjects_is_capped() {
        let (catalog, physics) = seeded();
        for i in 0..25 {
            catalog.add_subject(&format!("Topic {:02}", i), physics.level_id, 1).unwrap();
        }
        let found = catalog.search_subjects("topic", None, None).unwrap();
        assert_eq!(found.len(), SUBJECT_SEARCH_LIMIT);
        assert_eq!(found[0].name, "Topic 00");
    }

    #[test]
    fn test_students_at_level() {
        let (catalog, subject) = seeded();
        let other = catalog.add_level("Level 2").unwrap();
        catalog.add_student("a", Some(subject.level_id)).unwrap();
        catalog.add_student("b", Some(other.id)).unwrap();
        catalog.add_student("c", None).unwrap();

        let found = catalog
            .with_conn(|conn| students_at_level(conn, subject.level_id))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "a");
    }
}
