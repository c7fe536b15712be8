//! Knowledge command handler.
//!
//! Validates, summarizes and inspects the assistant's knowledge base.

use super::print_json;
use clap::{Args, Subcommand};
use hub_assistant::UnansweredLog;
use hub_core::{config::HubConfig, AppResult};

/// Knowledge base management
#[derive(Args, Debug)]
pub struct KnowledgeCommand {
    #[command(subcommand)]
    pub action: KnowledgeAction,
}

#[derive(Subcommand, Debug)]
pub enum KnowledgeAction {
    /// Load the knowledge base and report the new snapshot
    Reload(KnowledgeReloadCommand),
    /// Show knowledge base statistics
    Stats(KnowledgeStatsCommand),
    /// List questions the assistant could not answer
    Unanswered(KnowledgeUnansweredCommand),
}

impl KnowledgeCommand {
    pub async fn execute(&self, config: &HubConfig) -> AppResult<()> {
        match &self.action {
            KnowledgeAction::Reload(cmd) => cmd.execute(config).await,
            KnowledgeAction::Stats(cmd) => cmd.execute(config).await,
            KnowledgeAction::Unanswered(cmd) => cmd.execute(config).await,
        }
    }
}

/// Reload the knowledge base
#[derive(Args, Debug)]
pub struct KnowledgeReloadCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeReloadCommand {
    pub async fn execute(&self, config: &HubConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge reload command");

        let engine = hub_assistant::open_engine(config)?;
        engine.reload()?;
        let info = engine.snapshot_info()?;

        if self.json {
            return print_json(&info);
        }

        if let Some(info) = info {
            println!(
                "Loaded {} entries from {} (version {})",
                info.entries, info.source, info.version
            );
        }

        Ok(())
    }
}

/// Show knowledge base stats
#[derive(Args, Debug)]
pub struct KnowledgeStatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeStatsCommand {
    pub async fn execute(&self, config: &HubConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge stats command");

        let stats = hub_assistant::stats(config)?;

        if self.json {
            return print_json(&stats);
        }

        println!("Source: {}", stats.source);
        println!("Entries: {} ({} with a question)", stats.entries, stats.questions);
        println!("By intent:");
        for (intent, count) in &stats.by_intent {
            println!("  {:<24} {}", intent, count);
        }
        println!("By language:");
        for (language, count) in &stats.by_language {
            println!("  {:<24} {}", language, count);
        }
        println!("Unanswered questions: {}", stats.unanswered);

        Ok(())
    }
}

/// List unanswered questions
#[derive(Args, Debug)]
pub struct KnowledgeUnansweredCommand {
    /// Show only the most recent N questions
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeUnansweredCommand {
    pub async fn execute(&self, config: &HubConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge unanswered command");

        let mut records = UnansweredLog::new(&config.unanswered_log).read_all()?;
        if let Some(limit) = self.limit {
            let skip = records.len().saturating_sub(limit);
            records.drain(..skip);
        }

        if self.json {
            return print_json(&records);
        }

        if records.is_empty() {
            println!("No unanswered questions");
        }
        for record in &records {
            println!("{}  [{}]  {}", record.ts, record.lang, record.question);
        }

        Ok(())
    }
}
