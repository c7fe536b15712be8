//! Study Hub Core Library
//!
//! This crate provides the foundational utilities shared by every Study Hub
//! crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{DriveSettings, HubConfig};
pub use error::{AppError, AppResult};
