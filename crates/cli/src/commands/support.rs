//! Support command handler.
//!
//! Live support chat between students or guests and staff.

use super::print_json;
use clap::{Args, Subcommand};
use hub_catalog::{Catalog, Requester, Sender, SupportDesk};
use hub_core::{config::HubConfig, AppResult};
use std::sync::Arc;
use uuid::Uuid;

/// Live support chat
#[derive(Args, Debug)]
pub struct SupportCommand {
    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub action: SupportAction,
}

#[derive(Subcommand, Debug)]
pub enum SupportAction {
    /// Open a session, or resume the user's active one
    Start {
        /// Logged-in username
        #[arg(short, long, conflicts_with = "name")]
        user: Option<String>,

        /// Guest display name
        #[arg(short, long)]
        name: Option<String>,

        /// Guest email
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Post a message
    Send {
        /// Session token
        token: Uuid,

        /// Message text
        #[arg(default_value = "")]
        message: String,

        /// Sender (student or support)
        #[arg(short, long, default_value = "student")]
        sender: Sender,

        /// Attached file URL
        #[arg(short, long)]
        file_url: Option<String>,
    },
    /// Fetch messages newer than a message id
    Poll {
        /// Session token
        token: Uuid,

        /// Last message id already seen
        #[arg(short, long, default_value = "0")]
        after: i64,
    },
    /// List active sessions for staff
    Sessions,
    /// Archive a session
    End {
        /// Session token
        token: Uuid,
    },
    /// Mark the student's messages of a session read
    Read {
        /// Session token
        token: Uuid,
    },
}

impl SupportCommand {
    pub async fn execute(&self, config: &HubConfig) -> AppResult<()> {
        tracing::info!("Executing support command");

        let desk = SupportDesk::new(Arc::new(Catalog::open(&config.database)?));

        match &self.action {
            SupportAction::Start { user, name, email } => {
                let requester = Requester {
                    user: user.clone(),
                    guest_name: name.clone(),
                    guest_email: email.clone(),
                };
                let session = desk.start(&requester)?;
                if self.json {
                    return print_json(&session);
                }
                println!("Session {} for {}", session.token, session.display_name());
            }
            SupportAction::Send {
                token,
                message,
                sender,
                file_url,
            } => {
                let sent = desk.send(token, *sender, message, file_url.as_deref())?;
                if self.json {
                    return print_json(&sent);
                }
                println!("Sent message {}", sent.id);
            }
            SupportAction::Poll { token, after } => {
                let messages = desk.poll(token, *after)?;
                if self.json {
                    return print_json(&messages);
                }
                for message in &messages {
                    println!(
                        "{:>5}  [{}] {}  {}",
                        message.id,
                        message.sender,
                        message.created_at.format("%H:%M:%S"),
                        message.message
                    );
                    if let Some(url) = &message.file_url {
                        println!("       file: {}", url);
                    }
                }
            }
            SupportAction::Sessions => {
                let sessions = desk.active_sessions()?;
                if self.json {
                    return print_json(&sessions);
                }
                if sessions.is_empty() {
                    println!("No active sessions");
                }
                for session in &sessions {
                    println!(
                        "{}  {:<20}  {} unread  (updated {})",
                        session.token,
                        session.name,
                        session.unread,
                        session.updated_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
            SupportAction::End { token } => {
                desk.end(token)?;
                println!("Session {} ended", token);
            }
            SupportAction::Read { token } => {
                let marked = desk.mark_read(token)?;
                if self.json {
                    return print_json(&serde_json::json!({ "marked": marked }));
                }
                println!("Marked {} messages read", marked);
            }
        }

        Ok(())
    }
}
