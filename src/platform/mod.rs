//! Chat-platform abstraction.
//!
//! The onboarding engine only ever talks to the platform through
//! [`ChatPlatform`]. Channel logs are re-read on every event, so an
//! implementation never has to push state back into the engine.

pub mod cli;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PlatformError;

pub use cli::CliSession;
pub use memory::InMemoryPlatform;

/// Who wrote a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    /// Display name, used when rendering transcripts.
    pub name: String,
    pub bot: bool,
}

/// A single chat message. The id survives edits; the content does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    pub author: Author,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
}

/// A text channel (or category).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    /// The member this channel was created for, if it is a private channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
}

impl Channel {
    /// Platform mention markup, e.g. `<#1234>`.
    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }
}

/// Options for [`ChatPlatform::create_channel`].
#[derive(Debug, Clone, Default)]
pub struct ChannelOptions {
    /// Category to nest the channel under.
    pub category: Option<String>,
    pub topic: Option<String>,
    /// Member granted access to an otherwise hidden channel.
    pub member_id: Option<String>,
}

/// A server role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
}

/// A member of the community server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub username: String,
    pub discriminator: String,
    /// Display name; mirrors the author name on the member's messages.
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default)]
    pub has_avatar: bool,
    /// Role ids currently held.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Member {
    /// Platform mention markup, e.g. `<@1234>`.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }

    /// `username#discriminator`.
    pub fn tag(&self) -> String {
        format!("{}#{}", self.username, self.discriminator)
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.iter().any(|r| r == &role.id)
    }
}

/// Everything the onboarding engine needs from the chat platform.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// The bot's own user id. Messages with this author are prompts and notices.
    fn bot_user_id(&self) -> &str;

    // ── Channels ────────────────────────────────────────────────────

    async fn create_channel(
        &self,
        name: &str,
        options: ChannelOptions,
    ) -> Result<Channel, PlatformError>;

    async fn get_channel(&self, channel_id: &str) -> Result<Option<Channel>, PlatformError>;

    /// Look up a channel by exact name.
    async fn find_channel(&self, name: &str) -> Result<Option<Channel>, PlatformError>;

    async fn delete_channel(&self, channel_id: &str) -> Result<(), PlatformError>;

    // ── Messages ────────────────────────────────────────────────────

    /// All messages in a channel, newest first.
    async fn fetch_messages(&self, channel_id: &str) -> Result<Vec<Message>, PlatformError>;

    /// Send a message as the bot.
    async fn send_message(&self, channel_id: &str, content: &str)
    -> Result<Message, PlatformError>;

    /// Replace the content of a message, keeping its id.
    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<Message, PlatformError>;

    async fn delete_message(&self, channel_id: &str, message_id: &str)
    -> Result<(), PlatformError>;

    // ── Members & roles ─────────────────────────────────────────────

    async fn get_member(&self, member_id: &str) -> Result<Option<Member>, PlatformError>;

    /// Look up a role by exact name.
    async fn find_role(&self, name: &str) -> Result<Option<Role>, PlatformError>;

    async fn add_role(&self, member_id: &str, role: &Role) -> Result<(), PlatformError>;

    async fn remove_role(&self, member_id: &str, role: &Role) -> Result<(), PlatformError>;

    async fn set_nickname(&self, member_id: &str, nickname: &str) -> Result<(), PlatformError>;
}
