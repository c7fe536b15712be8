//! Import and upload notifications rendered from Handlebars templates.

use crate::types::{ResourceCategory, Subject};
use handlebars::Handlebars;
use hub_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TITLE_TEMPLATE: &str = "New Resources Imported";
pub const DEFAULT_MESSAGE_TEMPLATE: &str =
    "{{count}} new {{category}} files have been added for {{subject}}.";

pub const DEFAULT_UPLOAD_TITLE_TEMPLATE: &str = "New Resource Uploaded";
pub const DEFAULT_UPLOAD_MESSAGE_TEMPLATE: &str =
    "A new {{category}} link has been added for {{subject}}. Check it out!";

/// Title and message templates of the notification sent after an import
/// or a manual upload.
///
/// Both see `count`, `category` and `subject`. An upload renders with a
/// count of 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationTemplates {
    pub title: String,
    pub message: String,
}

impl Default for NotificationTemplates {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE_TEMPLATE.to_string(),
            message: DEFAULT_MESSAGE_TEMPLATE.to_string(),
        }
    }
}

impl NotificationTemplates {
    /// Templates for a single resource added by hand.
    pub fn upload() -> Self {
        Self {
            title: DEFAULT_UPLOAD_TITLE_TEMPLATE.to_string(),
            message: DEFAULT_UPLOAD_MESSAGE_TEMPLATE.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ImportContext<'a> {
    count: usize,
    category: &'a str,
    subject: &'a str,
}

/// A rendered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNotification {
    pub title: String,
    pub message: String,
}

/// Compiled notification templates.
pub struct Notifier {
    registry: Handlebars<'static>,
}

impl Notifier {
    pub fn new(templates: &NotificationTemplates) -> AppResult<Self> {
        let mut registry = Handlebars::new();

        // Plain text, not HTML
        registry.register_escape_fn(handlebars::no_escape);
        registry.set_strict_mode(true);

        registry
            .register_template_string("title", &templates.title)
            .map_err(|e| AppError::Config(format!("Invalid notification title template: {}", e)))?;
        registry
            .register_template_string("message", &templates.message)
            .map_err(|e| {
                AppError::Config(format!("Invalid notification message template: {}", e))
            })?;

        Ok(Self { registry })
    }

    /// Render the notification for `count` new files of `category` in `subject`.
    pub fn render(
        &self,
        count: usize,
        category: ResourceCategory,
        subject: &Subject,
    ) -> AppResult<RenderedNotification> {
        let context = ImportContext {
            count,
            category: category.as_str(),
            subject: &subject.name,
        };

        let render = |name: &str| {
            self.registry.render(name, &context).map_err(|e| {
                AppError::Other(format!("Failed to render notification {}: {}", name, e))
            })
        };

        Ok(RenderedNotification {
            title: render("title")?,
            message: render("message")?,
        })
    }
}
