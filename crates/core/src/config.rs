//! Configuration management for Study Hub.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config files (.hub/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric, with most state stored in `.hub/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Default Google Drive v3 API endpoint.
pub const DEFAULT_DRIVE_ENDPOINT: &str = "https://www.googleapis.com/drive/v3";

/// Default timeout for a folder listing call.
pub const DEFAULT_DRIVE_TIMEOUT_SECS: u64 = 30;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Path to the workspace root (contains .hub/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// SQLite database holding catalog, conversations and support chat
    pub database: PathBuf,

    /// Knowledge base file or directory read by the assistant
    pub knowledge_path: PathBuf,

    /// Append-only log of questions the assistant could not answer
    pub unanswered_log: PathBuf,

    /// Remote drive listing settings
    pub drive: DriveSettings,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Drive listing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveSettings {
    /// Base URL of the Drive v3 API
    pub endpoint: String,

    /// Name of the env var holding an API key
    pub api_key_env: String,

    /// Name of the env var holding an OAuth bearer token
    pub access_token_env: String,

    /// Name of the env var holding a service account key as JSON
    pub credentials_json_env: String,

    /// Service account key file, used when the env var is unset
    pub credentials_file: PathBuf,

    /// Listing timeout in seconds
    pub timeout_secs: u64,
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_DRIVE_ENDPOINT.to_string(),
            api_key_env: "GOOGLE_DRIVE_API_KEY".to_string(),
            access_token_env: "GOOGLE_DRIVE_ACCESS_TOKEN".to_string(),
            credentials_json_env: "GOOGLE_CREDENTIALS_JSON".to_string(),
            credentials_file: PathBuf::from("credentials.json"),
            timeout_secs: DEFAULT_DRIVE_TIMEOUT_SECS,
        }
    }
}

impl DriveSettings {
    /// Resolve the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        non_empty_env(&self.api_key_env)
    }

    /// Resolve the bearer token from the configured environment variable.
    pub fn access_token(&self) -> Option<String> {
        non_empty_env(&self.access_token_env)
    }

    /// Resolve the service account JSON from the configured environment variable.
    pub fn credentials_json(&self) -> Option<String> {
        non_empty_env(&self.credentials_json_env)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    workspace: Option<WorkspaceSection>,
    database: Option<DatabaseSection>,
    assistant: Option<AssistantSection>,
    drive: Option<DriveSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatabaseSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AssistantSection {
    #[serde(rename = "knowledgePath")]
    knowledge_path: Option<String>,
    #[serde(rename = "unansweredLog")]
    unanswered_log: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DriveSection {
    endpoint: Option<String>,
    #[serde(rename = "apiKeyEnv")]
    api_key_env: Option<String>,
    #[serde(rename = "accessTokenEnv")]
    access_token_env: Option<String>,
    #[serde(rename = "credentialsJsonEnv")]
    credentials_json_env: Option<String>,
    #[serde(rename = "credentialsFile")]
    credentials_file: Option<String>,
    #[serde(rename = "timeoutSecs")]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for HubConfig {
    fn default() -> Self {
        let workspace = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::for_workspace(workspace)
    }
}

impl HubConfig {
    /// Build a default configuration rooted at `workspace`.
    pub fn for_workspace(workspace: impl Into<PathBuf>) -> Self {
        let workspace = workspace.into();
        let hub_dir = workspace.join(".hub");
        let drive = DriveSettings {
            credentials_file: workspace.join("credentials.json"),
            ..DriveSettings::default()
        };
        Self {
            database: hub_dir.join("hub.sqlite"),
            knowledge_path: hub_dir.join("knowledge").join("qa.json"),
            unanswered_log: hub_dir.join("unanswered_questions.jsonl"),
            workspace,
            config_file: None,
            drive,
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }

    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `HUB_WORKSPACE`: Override workspace path
    /// - `HUB_CONFIG`: Path to config file
    /// - `HUB_DATABASE`: SQLite database path
    /// - `HUB_KNOWLEDGE_PATH`: Knowledge base file or directory
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use hub_core::config::HubConfig;
    ///
    /// let config = HubConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`HubConfig::load`], with explicit workspace and config file
    /// paths taking precedence over `HUB_WORKSPACE` and `HUB_CONFIG`.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let workspace = workspace.or_else(|| std::env::var("HUB_WORKSPACE").ok().map(PathBuf::from));
        let mut config = match workspace {
            Some(workspace) => Self::for_workspace(workspace),
            None => Self::default(),
        };

        config.config_file =
            config_file.or_else(|| std::env::var("HUB_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.hub_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(database) = std::env::var("HUB_DATABASE") {
            config.database = PathBuf::from(database);
        }

        if let Ok(knowledge) = std::env::var("HUB_KNOWLEDGE_PATH") {
            config.knowledge_path = PathBuf::from(knowledge);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(self.merge(config_file))
    }

    fn merge(&self, file: ConfigFile) -> Self {
        let mut result = self.clone();

        if let Some(path) = file.workspace.and_then(|ws| ws.path) {
            let rebased = Self::for_workspace(path);
            result.workspace = rebased.workspace;
            result.database = rebased.database;
            result.knowledge_path = rebased.knowledge_path;
            result.unanswered_log = rebased.unanswered_log;
            result.drive.credentials_file = rebased.drive.credentials_file;
        }

        if let Some(path) = file.database.and_then(|db| db.path) {
            result.database = result.resolve(&path);
        }

        if let Some(assistant) = file.assistant {
            if let Some(path) = assistant.knowledge_path {
                result.knowledge_path = result.resolve(&path);
            }
            if let Some(path) = assistant.unanswered_log {
                result.unanswered_log = result.resolve(&path);
            }
        }

        if let Some(drive) = file.drive {
            if let Some(endpoint) = drive.endpoint {
                result.drive.endpoint = endpoint;
            }
            if let Some(env) = drive.api_key_env {
                result.drive.api_key_env = env;
            }
            if let Some(env) = drive.access_token_env {
                result.drive.access_token_env = env;
            }
            if let Some(env) = drive.credentials_json_env {
                result.drive.credentials_json_env = env;
            }
            if let Some(path) = drive.credentials_file {
                result.drive.credentials_file = result.resolve(&path);
            }
            if let Some(secs) = drive.timeout_secs {
                result.drive.timeout_secs = secs;
            }
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        result
    }

    /// Resolve a possibly relative path against the workspace root.
    fn resolve(&self, path: &str) -> PathBuf {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            path
        } else {
            self.workspace.join(path)
        }
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and
    /// the config file.
    pub fn with_overrides(
        mut self,
        database: Option<PathBuf>,
        knowledge_path: Option<PathBuf>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(database) = database {
            self.database = database;
        }

        if let Some(knowledge_path) = knowledge_path {
            self.knowledge_path = knowledge_path;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .hub directory.
    pub fn hub_dir(&self) -> PathBuf {
        self.workspace.join(".hub")
    }

    /// Ensure the .hub directory exists.
    pub fn ensure_hub_dir(&self) -> AppResult<()> {
        let hub_dir = self.hub_dir();
        if !hub_dir.exists() {
            std::fs::create_dir_all(&hub_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .hub directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Validate settings that would otherwise fail late.
    pub fn validate(&self) -> AppResult<()> {
        if self.drive.timeout_secs == 0 {
            return Err(AppError::Config(
                "drive.timeoutSecs must be greater than zero".to_string(),
            ));
        }

        if !self.drive.endpoint.starts_with("http://") && !self.drive.endpoint.starts_with("https://")
        {
            return Err(AppError::Config(format!(
                "drive.endpoint must be an http(s) URL: {}",
                self.drive.endpoint
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_paths_live_under_hub_dir() {
        let config = HubConfig::for_workspace("/srv/hub");
        assert_eq!(config.hub_dir(), PathBuf::from("/srv/hub/.hub"));
        assert!(config.database.starts_with("/srv/hub/.hub"));
        assert!(config.knowledge_path.ends_with("qa.json"));
        assert!(config.unanswered_log.ends_with("unanswered_questions.jsonl"));
        assert_eq!(config.drive.timeout_secs, DEFAULT_DRIVE_TIMEOUT_SECS);
        assert_eq!(
            config.drive.credentials_file,
            PathBuf::from("/srv/hub/credentials.json")
        );
    }

    #[test]
    fn test_merge_yaml_resolves_relative_paths() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
database:
  path: data/hub.db
assistant:
  knowledgePath: kb
  unansweredLog: /var/log/unanswered.jsonl
drive:
  timeoutSecs: 5
  credentialsFile: secrets/sa.json
logging:
  level: warn
  color: false
"#,
        )
        .unwrap();

        let config = HubConfig::for_workspace(temp.path());
        let merged = config.merge_yaml(&path).unwrap();

        assert_eq!(merged.database, temp.path().join("data/hub.db"));
        assert_eq!(merged.knowledge_path, temp.path().join("kb"));
        assert_eq!(
            merged.unanswered_log,
            PathBuf::from("/var/log/unanswered.jsonl")
        );
        assert_eq!(merged.drive.timeout_secs, 5);
        assert_eq!(merged.drive.credentials_file, temp.path().join("secrets/sa.json"));
        assert_eq!(merged.log_level.as_deref(), Some("warn"));
        assert!(merged.no_color);
    }

    #[test]
    fn test_with_overrides() {
        let config = HubConfig::for_workspace("/tmp");
        let overridden = config.with_overrides(
            Some(PathBuf::from("/tmp/other.sqlite")),
            None,
            None,
            true,
            false,
        );

        assert_eq!(overridden.database, PathBuf::from("/tmp/other.sqlite"));
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_load_from_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.yaml");
        std::fs::write(&path, "drive:\n  timeoutSecs: 7\n").unwrap();

        let config =
            HubConfig::load_from(Some(temp.path().to_path_buf()), Some(path.clone())).unwrap();
        assert_eq!(config.workspace, temp.path());
        assert_eq!(config.config_file, Some(path));
        assert_eq!(config.drive.timeout_secs, 7);
    }

    #[test]
    fn test_load_from_missing_workspace_fails() {
        let result = HubConfig::load_from(Some(PathBuf::from("/definitely/not/here")), None);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = HubConfig::for_workspace("/tmp");
        assert!(config.validate().is_ok());
        config.drive.timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
