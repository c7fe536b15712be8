//! Error types for Study Hub.
//!
//! This module defines a unified error enum that covers all error categories
//! in the workspace: configuration, I/O, validation, knowledge retrieval,
//! drive listing and storage.

use thiserror::Error;

/// Unified error type for Study Hub.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// We never panic on bad input; errors are represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Caller supplied incomplete or malformed input. Nothing was written.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Knowledge base loading and answer retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// The knowledge store has not been set up yet
    #[error("Knowledge store not initialized: {0}")]
    KnowledgeStoreMissing(String),

    /// Remote drive listing errors
    #[error("Drive error: {0}")]
    Drive(String),

    /// The folder reference could not be parsed into a folder id
    #[error("Invalid Google Drive folder reference: {0}")]
    InvalidFolderReference(String),

    /// No drive credentials were found in the environment
    #[error("Drive credentials unavailable: {0}")]
    CredentialsUnavailable(String),

    /// Database and persistence errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
