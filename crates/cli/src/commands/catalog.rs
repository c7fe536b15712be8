//! Catalog command handler.
//!
//! Administers levels, subjects, students and resources. Students read
//! their notifications and keep private notes.

use super::print_json;
use clap::{Args, Subcommand};
use hub_catalog::{
    Catalog, ImportedResource, NotificationTemplates, Notifier, ResourceCategory, ResourceUpload,
    Student, Subject,
};
use hub_core::{config::HubConfig, AppError, AppResult};

/// Levels, subjects, students, resources, notes and notifications
#[derive(Args, Debug)]
pub struct CatalogCommand {
    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub action: CatalogAction,
}

#[derive(Subcommand, Debug)]
pub enum CatalogAction {
    /// Academic levels
    Level {
        #[command(subcommand)]
        action: LevelAction,
    },
    /// Subjects
    Subject {
        #[command(subcommand)]
        action: SubjectAction,
    },
    /// Students
    Student {
        #[command(subcommand)]
        action: StudentAction,
    },
    /// Course resources
    Resource {
        #[command(subcommand)]
        action: ResourceAction,
    },
    /// A student's private notes
    Note {
        #[command(subcommand)]
        action: NoteAction,
    },
    /// Show a student's notifications
    Notifications {
        /// Student username
        username: String,

        /// Mark every unread notification read
        #[arg(long)]
        mark_read: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum LevelAction {
    /// Add a level
    Add { title: String },
    /// List levels
    List,
}

#[derive(Subcommand, Debug)]
pub enum SubjectAction {
    /// Add a subject
    Add {
        name: String,

        /// Level id
        #[arg(short, long)]
        level: i64,

        /// Semester (1 or 2)
        #[arg(short, long, default_value = "1")]
        semester: u8,
    },
    /// List subjects
    List {
        /// Only subjects of this level
        #[arg(short, long)]
        level: Option<i64>,
    },
    /// Find subjects by name
    Search {
        /// Text the name must contain (any case)
        #[arg(default_value = "")]
        query: String,

        /// Only subjects of this level
        #[arg(short, long)]
        level: Option<i64>,

        /// Only subjects of this semester
        #[arg(short, long)]
        semester: Option<u8>,
    },
}

#[derive(Subcommand, Debug)]
pub enum StudentAction {
    /// Register a student
    Add {
        username: String,

        /// Level id
        #[arg(short, long)]
        level: Option<i64>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ResourceAction {
    /// List the resources of a subject category
    List {
        /// Subject id
        #[arg(short, long)]
        subject: i64,

        /// Category name
        #[arg(short, long)]
        category: String,
    },
    /// Add a resource by hand and notify the subject's level
    Add {
        /// Subject id
        #[arg(short, long)]
        subject: i64,

        /// Category name
        #[arg(short, long)]
        category: String,

        /// Display title
        #[arg(short, long)]
        title: String,

        /// Preview link
        #[arg(long)]
        preview: String,

        /// Download link
        #[arg(long)]
        download: String,
    },
    /// Delete a resource
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum NoteAction {
    /// Save a note
    Add {
        /// Student username
        username: String,

        content: String,

        /// Note title
        #[arg(short, long, default_value = "")]
        title: String,
    },
    /// List notes, newest first
    List {
        /// Student username
        username: String,
    },
    /// Delete one of the student's notes
    Delete {
        /// Student username
        username: String,

        id: i64,
    },
}

impl CatalogCommand {
    pub async fn execute(&self, config: &HubConfig) -> AppResult<()> {
        tracing::info!("Executing catalog command");

        let catalog = Catalog::open(&config.database)?;

        match &self.action {
            CatalogAction::Level { action } => self.level(&catalog, action),
            CatalogAction::Subject { action } => self.subject(&catalog, action),
            CatalogAction::Student { action } => self.student(&catalog, action),
            CatalogAction::Resource { action } => self.resource(&catalog, action),
            CatalogAction::Note { action } => self.note(&catalog, action),
            CatalogAction::Notifications {
                username,
                mark_read,
            } => self.notifications(&catalog, username, *mark_read),
        }
    }

    fn level(&self, catalog: &Catalog, action: &LevelAction) -> AppResult<()> {
        match action {
            LevelAction::Add { title } => {
                let level = catalog.add_level(title)?;
                if self.json {
                    return print_json(&level);
                }
                println!("Created level {} ({})", level.title, level.id);
            }
            LevelAction::List => {
                let levels = catalog.levels()?;
                if self.json {
                    return print_json(&levels);
                }
                for level in &levels {
                    println!("{:>5}  {}", level.id, level.title);
                }
            }
        }
        Ok(())
    }

    fn subject(&self, catalog: &Catalog, action: &SubjectAction) -> AppResult<()> {
        match action {
            SubjectAction::Add {
                name,
                level,
                semester,
            } => {
                let subject = catalog.add_subject(name, *level, *semester)?;
                if self.json {
                    return print_json(&subject);
                }
                println!("Created subject {} ({})", subject.name, subject.id);
            }
            SubjectAction::List { level } => {
                let subjects = catalog.subjects(*level)?;
                if self.json {
                    return print_json(&subjects);
                }
                print_subjects(&subjects);
            }
            SubjectAction::Search {
                query,
                level,
                semester,
            } => {
                let subjects = catalog.search_subjects(query, *level, *semester)?;
                if self.json {
                    return print_json(&subjects);
                }
                if subjects.is_empty() {
                    println!("No subjects match '{}'", query);
                }
                print_subjects(&subjects);
            }
        }
        Ok(())
    }

    fn student(&self, catalog: &Catalog, action: &StudentAction) -> AppResult<()> {
        match action {
            StudentAction::Add { username, level } => {
                let student = catalog.add_student(username, *level)?;
                if self.json {
                    return print_json(&student);
                }
                println!("Registered {} ({})", student.username, student.id);
            }
        }
        Ok(())
    }

    fn resource(&self, catalog: &Catalog, action: &ResourceAction) -> AppResult<()> {
        match action {
            ResourceAction::List { subject, category } => {
                let category: ResourceCategory = category.parse()?;
                let resources = catalog.resources(*subject, category)?;
                if self.json {
                    return print_json(&resources);
                }
                for resource in &resources {
                    print_resource(resource);
                }
            }
            ResourceAction::Add {
                subject,
                category,
                title,
                preview,
                download,
            } => {
                let upload = ResourceUpload {
                    subject_id: *subject,
                    category: category.parse()?,
                    title: title.clone(),
                    preview_url: preview.clone(),
                    download_url: download.clone(),
                };
                let notifier = Notifier::new(&NotificationTemplates::upload())?;
                let report = catalog.add_resource(&upload, &notifier)?;
                if self.json {
                    return print_json(&report);
                }
                println!(
                    "Added resource {} ({}), notified {} students",
                    report.resource.title, report.resource.id, report.notified_count
                );
            }
            ResourceAction::Delete { id } => {
                if !catalog.delete_resource(*id)? {
                    return Err(AppError::Validation(format!("No resource {}", id)));
                }
                println!("Resource {} deleted", id);
            }
        }
        Ok(())
    }

    fn note(&self, catalog: &Catalog, action: &NoteAction) -> AppResult<()> {
        match action {
            NoteAction::Add {
                username,
                content,
                title,
            } => {
                let student = find_student(catalog, username)?;
                let note = catalog.add_note(student.id, title, content)?;
                if self.json {
                    return print_json(&note);
                }
                println!("Saved note {} ({})", note.title, note.id);
            }
            NoteAction::List { username } => {
                let student = find_student(catalog, username)?;
                let notes = catalog.notes(student.id)?;
                if self.json {
                    return print_json(&notes);
                }
                for note in &notes {
                    println!(
                        "{:>5}  {}  {}",
                        note.id,
                        note.created_at.format("%b %d"),
                        note.title
                    );
                    println!("       {}", note.content);
                }
            }
            NoteAction::Delete { username, id } => {
                let student = find_student(catalog, username)?;
                if !catalog.delete_note(student.id, *id)? {
                    return Err(AppError::Validation(format!(
                        "Note {} not found for {}",
                        id, username
                    )));
                }
                println!("Note {} deleted", id);
            }
        }
        Ok(())
    }

    fn notifications(&self, catalog: &Catalog, username: &str, mark_read: bool) -> AppResult<()> {
        let student = find_student(catalog, username)?;
        let notifications = catalog.notifications(student.id)?;
        let marked = if mark_read {
            catalog.mark_notifications_read(student.id)?
        } else {
            0
        };

        if self.json {
            return print_json(&notifications);
        }

        for notification in &notifications {
            let marker = if notification.is_read { " " } else { "*" };
            println!(
                "{} {}  {}",
                marker,
                notification.created_at.format("%Y-%m-%d %H:%M"),
                notification.title
            );
            println!("    {}", notification.message);
        }
        if mark_read {
            println!("Marked {} notifications read", marked);
        }
        Ok(())
    }
}

fn print_subjects(subjects: &[Subject]) {
    for subject in subjects {
        println!(
            "{:>5}  {}  (level {}, semester {})",
            subject.id, subject.name, subject.level_id, subject.semester
        );
    }
}

fn print_resource(resource: &ImportedResource) {
    println!("{:>5}  {}", resource.id, resource.title);
    println!("       preview:  {}", resource.preview_url);
    println!("       download: {}", resource.download_url);
    if let Some(solution) = &resource.solution_url {
        println!("       solution: {}", solution);
    }
}

fn find_student(catalog: &Catalog, username: &str) -> AppResult<Student> {
    catalog
        .student_by_name(username)?
        .ok_or_else(|| AppError::Validation(format!("Unknown student: {}", username)))
}
