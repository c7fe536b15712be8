//! Study Hub CLI
//!
//! Main entry point for the hub command-line tool.
//! Drives the study assistant, drive imports, the course catalog and
//! support chat against a local workspace.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    AskCommand, CatalogCommand, ImportCommand, KnowledgeCommand, SessionsCommand, SupportCommand,
};
use hub_core::{config::HubConfig, logging, AppResult};
use std::path::PathBuf;

/// Study Hub CLI - course materials and a study assistant
#[derive(Parser, Debug)]
#[command(name = "hub")]
#[command(about = "Course materials and a study assistant", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "HUB_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "HUB_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, global = true, env = "HUB_DATABASE")]
    database: Option<PathBuf>,

    /// Knowledge base file or directory
    #[arg(long, global = true, env = "HUB_KNOWLEDGE_PATH")]
    knowledge_path: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long, global = true, default_value = "pretty")]
    log_format: logging::LogFormat,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask the study assistant a question
    Ask(AskCommand),

    /// Assistant conversation history
    Sessions(SessionsCommand),

    /// Knowledge base management
    Knowledge(KnowledgeCommand),

    /// Import a drive folder into a subject category
    Import(ImportCommand),

    /// Levels, subjects, students, resources and notifications
    Catalog(CatalogCommand),

    /// Live support chat
    Support(SupportCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ask(_) => "ask",
            Commands::Sessions(_) => "sessions",
            Commands::Knowledge(_) => "knowledge",
            Commands::Import(_) => "import",
            Commands::Catalog(_) => "catalog",
            Commands::Support(_) => "support",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load configuration from the workspace, config file and environment
    let config = HubConfig::load_from(cli.workspace, cli.config)?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.database,
        cli.knowledge_path,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );
    config.validate()?;

    logging::init_logging(config.log_level.as_deref(), config.no_color, cli.log_format)?;

    tracing::info!("Study Hub CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Database: {:?}", config.database);
    tracing::debug!("Knowledge: {:?}", config.knowledge_path);

    config.ensure_hub_dir()?;

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Sessions(cmd) => cmd.execute(&config).await,
        Commands::Knowledge(cmd) => cmd.execute(&config).await,
        Commands::Import(cmd) => cmd.execute(&config).await,
        Commands::Catalog(cmd) => cmd.execute(&config).await,
        Commands::Support(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
