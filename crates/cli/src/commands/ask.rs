//! Ask command handler.
//!
//! Runs one chat turn against the study assistant.

use super::print_json;
use clap::Args;
use hub_core::{config::HubConfig, AppResult};

/// Ask the study assistant a question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Continue an existing conversation
    #[arg(short, long)]
    pub session: Option<i64>,

    /// Username owning the conversation
    #[arg(short, long, env = "HUB_USER", default_value = "student")]
    pub user: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &HubConfig) -> AppResult<()> {
        tracing::info!("Executing ask command for user '{}'", self.user);

        let assistant = hub_assistant::open_assistant(config)?;
        let turn = assistant.respond(&self.user, self.session, &self.question)?;

        tracing::debug!(
            "Session {:?} answered (matched={})",
            turn.session_id,
            turn.matched
        );

        if self.json {
            return print_json(&turn);
        }

        let Some(structured) = &turn.structured else {
            println!("{}", turn.response);
            return Ok(());
        };

        println!("{}", structured.answer);

        let metadata = &structured.metadata;
        let details: Vec<String> = [
            ("Program", &metadata.program),
            ("Level", &metadata.level),
            ("Course", &metadata.course),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.as_ref().map(|v| format!("{}: {}", label, v)))
        .collect();
        if !details.is_empty() {
            println!();
            println!("{}", details.join(" | "));
        }

        if !structured.related_questions.is_empty() {
            println!();
            println!("Related questions:");
            for question in &structured.related_questions {
                println!("- {}", question);
            }
        }

        if let Some(id) = turn.session_id {
            println!();
            println!("(session {}: {})", id, turn.session_title);
        }

        Ok(())
    }
}
