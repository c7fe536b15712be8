//! Sessions command handler.
//!
//! Lists, shows and deletes assistant conversations.

use super::print_json;
use clap::{Args, Subcommand};
use hub_assistant::{
    ChatMessage, ChatRole, ConversationStore, SqliteConversationStore, StructuredResponse,
};
use hub_core::{config::HubConfig, AppError, AppResult};

/// Assistant conversation history
#[derive(Args, Debug)]
pub struct SessionsCommand {
    /// Username owning the conversations
    #[arg(short, long, global = true, env = "HUB_USER", default_value = "student")]
    pub user: String,

    #[command(subcommand)]
    pub action: SessionsAction,
}

#[derive(Subcommand, Debug)]
pub enum SessionsAction {
    /// List conversations, most recent first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the messages of a conversation
    Show {
        /// Session id
        id: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a conversation and its messages
    Delete {
        /// Session id
        id: i64,
    },
}

impl SessionsCommand {
    pub async fn execute(&self, config: &HubConfig) -> AppResult<()> {
        tracing::info!("Executing sessions command for user '{}'", self.user);

        let store = SqliteConversationStore::open(&config.database)?;

        match &self.action {
            SessionsAction::List { json } => {
                let sessions = store.sessions(&self.user)?;
                if *json {
                    return print_json(&sessions);
                }
                if sessions.is_empty() {
                    println!("No conversations for '{}'", self.user);
                }
                for session in &sessions {
                    println!(
                        "{:>5}  {}  {}",
                        session.id,
                        session.updated_at.format("%Y-%m-%d %H:%M"),
                        session.title
                    );
                }
            }
            SessionsAction::Show { id, json } => {
                let session = store.session(&self.user, *id)?.ok_or_else(|| {
                    AppError::Validation(format!("No session {} for '{}'", id, self.user))
                })?;
                let messages = store.messages(session.id)?;
                if *json {
                    return print_json(&serde_json::json!({
                        "session": session,
                        "messages": messages,
                    }));
                }
                println!("{} ({})", session.title, session.id);
                for message in &messages {
                    println!();
                    println!("[{}] {}", message.role.as_str(), message.timestamp.format("%H:%M:%S"));
                    println!("{}", display_content(message));
                }
            }
            SessionsAction::Delete { id } => {
                if store.delete_session(&self.user, *id)? {
                    println!("Session {} deleted", id);
                } else {
                    return Err(AppError::Validation(format!(
                        "No session {} for '{}'",
                        id, self.user
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Model messages hold a JSON-encoded structured response; show its answer.
fn display_content(message: &ChatMessage) -> String {
    if message.role == ChatRole::Model {
        if let Ok(structured) = serde_json::from_str::<StructuredResponse>(&message.content) {
            return structured.answer;
        }
    }
    message.content.clone()
}
