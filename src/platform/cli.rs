//! CLI session: plays the new member against the in-memory server.
//!
//! Each line typed is posted to the welcome channel as the member. `/edit N
//! text` edits the member's N-th message, `/transcript` prints the channel,
//! `/quit` exits.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

use super::{Channel, ChatPlatform, InMemoryPlatform, Member};
use crate::error::Result;
use crate::onboarding::OnboardingManager;

/// A parsed line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Say(String),
    /// Edit the member's message with this 1-based index.
    Edit(usize, String),
    Transcript,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match line {
            "/quit" => return Some(Self::Quit),
            "/transcript" => return Some(Self::Transcript),
            _ => {}
        }
        if let Some(rest) = line.strip_prefix("/edit ") {
            let (index, text) = rest.trim().split_once(' ')?;
            let index = index.parse().ok().filter(|&i| i > 0)?;
            return Some(Self::Edit(index, text.trim().to_string()));
        }
        Some(Self::Say(line.to_string()))
    }
}

pub struct CliSession {
    platform: Arc<InMemoryPlatform>,
    manager: Arc<OnboardingManager>,
    member: Member,
    /// Bot messages already printed, by id, with the content printed.
    shown: HashMap<String, String>,
    /// Ids of the member's messages, oldest first.
    sent: Vec<String>,
}

impl CliSession {
    pub fn new(
        platform: Arc<InMemoryPlatform>,
        manager: Arc<OnboardingManager>,
        member: Member,
    ) -> Self {
        Self {
            platform,
            manager,
            member,
            shown: HashMap::new(),
            sent: Vec::new(),
        }
    }

    /// Run until EOF, `/quit`, or the welcome channel is deleted.
    pub async fn run(mut self) -> Result<()> {
        let channel = self.manager.on_new_member(&self.member).await?;
        self.print_updates(&channel).await;

        let reader = BufReader::new(tokio::io::stdin());
        let mut lines = reader.lines();
        eprint!("> ");

        while let Some(line) = lines.next_line().await? {
            let Some(command) = Command::parse(&line) else {
                eprint!("> ");
                continue;
            };
            match command {
                Command::Quit => break,
                Command::Transcript => {
                    println!("\n{}\n", self.platform.transcript(&channel.id).await);
                }
                Command::Say(text) => {
                    let message = self.platform.post(&channel.id, &self.member.id, &text).await?;
                    self.sent.push(message.id.clone());
                    if let Err(e) = self.manager.on_new_message(&message).await {
                        error!("Error handling message: {}", e);
                    }
                }
                Command::Edit(index, text) => {
                    let Some(id) = self.sent.get(index - 1).cloned() else {
                        eprintln!("No message #{index}. You have sent {}.", self.sent.len());
                        eprint!("> ");
                        continue;
                    };
                    let (old, new) = self.platform.edit(&channel.id, &id, &text).await?;
                    if let Err(e) = self.manager.on_updated_message(&old, &new).await {
                        error!("Error handling edit: {}", e);
                    }
                }
            }

            if self.platform.is_deleted(&channel.id).await {
                eprintln!("🗑️  Welcome channel deleted.");
                break;
            }
            self.print_updates(&channel).await;
            eprint!("> ");
        }
        Ok(())
    }

    /// Print bot messages that are new or were edited since the last call.
    async fn print_updates(&mut self, channel: &Channel) {
        let messages = match self.platform.fetch_messages(&channel.id).await {
            Ok(messages) => messages,
            Err(e) => {
                error!("Error reading channel: {}", e);
                return;
            }
        };
        let bot_id = self.platform.bot_user_id().to_string();
        for message in messages.iter().rev().filter(|m| m.author.id == bot_id) {
            match self.shown.get(&message.id) {
                None => println!("\n{}", message.content),
                Some(previous) if previous != &message.content => {
                    println!("\n✏️  (edited) {}", message.content);
                }
                Some(_) => continue,
            }
            self.shown.insert(message.id.clone(), message.content.clone());
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("  "), None);
        assert_eq!(Command::parse("/quit"), Some(Command::Quit));
        assert_eq!(Command::parse("/transcript"), Some(Command::Transcript));
        assert_eq!(
            Command::parse("/edit 2 fred@acme.com"),
            Some(Command::Edit(2, "fred@acme.com".into()))
        );
        assert_eq!(Command::parse("/edit 0 Fred"), None);
        assert_eq!(Command::parse("/edit two Fred"), None);
        assert_eq!(Command::parse(" yes "), Some(Command::Say("yes".into())));
    }
}
