//! Command handlers for the Study Hub CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod catalog;
pub mod import;
pub mod knowledge;
pub mod sessions;
pub mod support;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use catalog::CatalogCommand;
pub use import::ImportCommand;
pub use knowledge::KnowledgeCommand;
pub use sessions::SessionsCommand;
pub use support::SupportCommand;

use hub_core::AppResult;
use serde::Serialize;

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> AppResult<()> {
    let text = serde_json::to_string_pretty(value)?;
    println!("{}", text);
    Ok(())
}
