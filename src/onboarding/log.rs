//! Read-only view over a welcome channel's messages.

use crate::platform::Message;

/// Whose message it is, relative to one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorRole {
    Bot,
    Member,
    /// Anyone else who can see the channel (moderators).
    Other,
}

/// The messages of one channel, newest first, with authorship resolved
/// against the bot and the member being onboarded.
#[derive(Debug, Clone)]
pub struct MessageLog {
    messages: Vec<Message>,
    bot_id: String,
    member_id: String,
}

impl MessageLog {
    /// `messages` must be newest first, as returned by the platform.
    pub fn new(messages: Vec<Message>, bot_id: impl Into<String>, member_id: impl Into<String>) -> Self {
        Self {
            messages,
            bot_id: bot_id.into(),
            member_id: member_id.into(),
        }
    }

    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// The `n` most recent messages, newest first.
    pub fn latest(&self, n: usize) -> &[Message] {
        &self.messages[..n.min(self.messages.len())]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn role_of(&self, message: &Message) -> AuthorRole {
        if message.author.id == self.bot_id {
            AuthorRole::Bot
        } else if message.author.id == self.member_id {
            AuthorRole::Member
        } else {
            AuthorRole::Other
        }
    }

    /// Messages by one kind of author, newest first.
    pub fn by_role(&self, role: AuthorRole) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(move |m| self.role_of(m) == role)
    }

    /// Position counted from the newest message (0 = newest).
    pub fn position_of(&self, message_id: &str) -> Option<usize> {
        self.messages.iter().position(|m| m.id == message_id)
    }

    pub fn get(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    /// Messages oldest first.
    pub fn chronological(&self) -> impl DoubleEndedIterator<Item = &Message> + ExactSizeIterator {
        self.messages.iter().rev()
    }

    /// The first bot message posted after `message_id`.
    pub fn bot_reply_to(&self, message_id: &str) -> Option<&Message> {
        let position = self.position_of(message_id)?;
        self.messages[..position]
            .iter()
            .rev()
            .find(|m| self.role_of(m) == AuthorRole::Bot)
    }
}
