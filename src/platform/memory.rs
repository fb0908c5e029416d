//! In-memory chat platform: a single server held behind a lock.
//!
//! Used by the terminal demo and the test-suite. Member-side helpers
//! (`post`, `edit`) only mutate the log; callers forward the resulting
//! events to the onboarding manager themselves, the way a gateway would.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{Author, Channel, ChannelOptions, ChatPlatform, Member, Message, Role};
use crate::error::PlatformError;

#[derive(Default)]
struct Inner {
    channels: Vec<Channel>,
    deleted: Vec<String>,
    /// Channel id → messages, newest first.
    messages: HashMap<String, Vec<Message>>,
    members: HashMap<String, Member>,
    roles: Vec<Role>,
    fail_nicknames: bool,
}

/// In-memory server with channels, members and roles.
pub struct InMemoryPlatform {
    bot: Author,
    inner: RwLock<Inner>,
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl InMemoryPlatform {
    pub fn new(bot_name: &str) -> Self {
        Self {
            bot: Author {
                id: format!("bot-{}", new_id()),
                name: bot_name.to_string(),
                bot: true,
            },
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Define a server role.
    pub async fn define_role(&self, name: &str) -> Role {
        let role = Role {
            id: new_id(),
            name: name.to_string(),
        };
        self.inner.write().await.roles.push(role.clone());
        role
    }

    /// Add a pre-existing public channel.
    pub async fn add_channel(&self, name: &str) -> Channel {
        let channel = Channel {
            id: new_id(),
            name: name.to_string(),
            member_id: None,
        };
        let mut inner = self.inner.write().await;
        inner.messages.insert(channel.id.clone(), Vec::new());
        inner.channels.push(channel.clone());
        channel
    }

    pub async fn add_member(&self, member: Member) {
        self.inner
            .write()
            .await
            .members
            .insert(member.id.clone(), member);
    }

    /// Make every following `set_nickname` call fail.
    pub async fn fail_nicknames(&self, fail: bool) {
        self.inner.write().await.fail_nicknames = fail;
    }

    pub async fn set_avatar(&self, member_id: &str, has_avatar: bool) {
        if let Some(member) = self.inner.write().await.members.get_mut(member_id) {
            member.has_avatar = has_avatar;
        }
    }

    /// Post a message as a member. Returns the stored message.
    pub async fn post(
        &self,
        channel_id: &str,
        member_id: &str,
        content: &str,
    ) -> Result<Message, PlatformError> {
        let mut inner = self.inner.write().await;
        let member = inner
            .members
            .get(member_id)
            .ok_or_else(|| PlatformError::MemberNotFound {
                id: member_id.to_string(),
            })?;
        let author = Author {
            id: member.id.clone(),
            name: member.display_name.clone(),
            bot: false,
        };
        push_message(&mut inner, channel_id, author, content)
    }

    /// Edit a message as its author. Returns `(old, new)`.
    pub async fn edit(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<(Message, Message), PlatformError> {
        let mut inner = self.inner.write().await;
        let message = find_message_mut(&mut inner, channel_id, message_id)?;
        let old = message.clone();
        message.content = content.to_string();
        message.edited_at = Some(Utc::now());
        Ok((old, message.clone()))
    }

    /// The private channel created for a member, if any (deleted ones included).
    pub async fn channel_for_member(&self, member_id: &str) -> Option<Channel> {
        self.inner
            .read()
            .await
            .channels
            .iter()
            .find(|c| c.member_id.as_deref() == Some(member_id))
            .cloned()
    }

    pub async fn is_deleted(&self, channel_id: &str) -> bool {
        self.inner.read().await.deleted.iter().any(|id| id == channel_id)
    }

    pub async fn member(&self, member_id: &str) -> Option<Member> {
        self.inner.read().await.members.get(member_id).cloned()
    }

    /// Names of the roles a member holds, in the order they were granted.
    pub async fn role_names(&self, member_id: &str) -> Vec<String> {
        let inner = self.inner.read().await;
        let Some(member) = inner.members.get(member_id) else {
            return Vec::new();
        };
        member
            .roles
            .iter()
            .filter_map(|id| inner.roles.iter().find(|r| &r.id == id))
            .map(|r| r.name.clone())
            .collect()
    }

    /// The whole channel as `Author: content` lines, oldest first.
    pub async fn transcript(&self, channel_id: &str) -> String {
        let inner = self.inner.read().await;
        inner
            .messages
            .get(channel_id)
            .map(|messages| {
                messages
                    .iter()
                    .rev()
                    .map(|m| format!("{}: {}", m.author.name, m.content))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    }

    /// The trailing run of bot messages, oldest first.
    pub async fn bot_responses(&self, channel_id: &str) -> Vec<String> {
        let inner = self.inner.read().await;
        let mut responses: Vec<String> = inner
            .messages
            .get(channel_id)
            .map(|messages| {
                messages
                    .iter()
                    .take_while(|m| m.author.id == self.bot.id)
                    .map(|m| m.content.clone())
                    .collect()
            })
            .unwrap_or_default();
        responses.reverse();
        responses
    }
}

fn push_message(
    inner: &mut Inner,
    channel_id: &str,
    author: Author,
    content: &str,
) -> Result<Message, PlatformError> {
    if content.is_empty() {
        return Err(PlatformError::EmptyMessage);
    }
    if inner.deleted.iter().any(|id| id == channel_id) {
        return Err(PlatformError::ChannelNotFound {
            id: channel_id.to_string(),
        });
    }
    let messages =
        inner
            .messages
            .get_mut(channel_id)
            .ok_or_else(|| PlatformError::ChannelNotFound {
                id: channel_id.to_string(),
            })?;
    let message = Message {
        id: new_id(),
        channel_id: channel_id.to_string(),
        author,
        content: content.to_string(),
        created_at: Utc::now(),
        edited_at: None,
    };
    messages.insert(0, message.clone());
    Ok(message)
}

fn find_message_mut<'a>(
    inner: &'a mut Inner,
    channel_id: &str,
    message_id: &str,
) -> Result<&'a mut Message, PlatformError> {
    inner
        .messages
        .get_mut(channel_id)
        .ok_or_else(|| PlatformError::ChannelNotFound {
            id: channel_id.to_string(),
        })?
        .iter_mut()
        .find(|m| m.id == message_id)
        .ok_or_else(|| PlatformError::MessageNotFound {
            channel: channel_id.to_string(),
            id: message_id.to_string(),
        })
}

#[async_trait]
impl ChatPlatform for InMemoryPlatform {
    fn bot_user_id(&self) -> &str {
        &self.bot.id
    }

    async fn create_channel(
        &self,
        name: &str,
        options: ChannelOptions,
    ) -> Result<Channel, PlatformError> {
        let channel = Channel {
            id: new_id(),
            name: name.to_string(),
            member_id: options.member_id,
        };
        debug!(channel = %channel.id, name, category = ?options.category, "Creating channel");
        let mut inner = self.inner.write().await;
        inner.messages.insert(channel.id.clone(), Vec::new());
        inner.channels.push(channel.clone());
        Ok(channel)
    }

    async fn get_channel(&self, channel_id: &str) -> Result<Option<Channel>, PlatformError> {
        let inner = self.inner.read().await;
        if inner.deleted.iter().any(|id| id == channel_id) {
            return Ok(None);
        }
        Ok(inner.channels.iter().find(|c| c.id == channel_id).cloned())
    }

    async fn find_channel(&self, name: &str) -> Result<Option<Channel>, PlatformError> {
        let inner = self.inner.read().await;
        Ok(inner
            .channels
            .iter()
            .find(|c| c.name == name && !inner.deleted.contains(&c.id))
            .cloned())
    }

    async fn delete_channel(&self, channel_id: &str) -> Result<(), PlatformError> {
        let mut inner = self.inner.write().await;
        if !inner.channels.iter().any(|c| c.id == channel_id) {
            return Err(PlatformError::ChannelNotFound {
                id: channel_id.to_string(),
            });
        }
        if !inner.deleted.iter().any(|id| id == channel_id) {
            inner.deleted.push(channel_id.to_string());
        }
        Ok(())
    }

    async fn fetch_messages(&self, channel_id: &str) -> Result<Vec<Message>, PlatformError> {
        let inner = self.inner.read().await;
        if inner.deleted.iter().any(|id| id == channel_id) {
            return Err(PlatformError::ChannelNotFound {
                id: channel_id.to_string(),
            });
        }
        inner
            .messages
            .get(channel_id)
            .cloned()
            .ok_or_else(|| PlatformError::ChannelNotFound {
                id: channel_id.to_string(),
            })
    }

    async fn send_message(
        &self,
        channel_id: &str,
        content: &str,
    ) -> Result<Message, PlatformError> {
        let mut inner = self.inner.write().await;
        push_message(&mut inner, channel_id, self.bot.clone(), content)
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<Message, PlatformError> {
        if content.is_empty() {
            return Err(PlatformError::EmptyMessage);
        }
        let mut inner = self.inner.write().await;
        let message = find_message_mut(&mut inner, channel_id, message_id)?;
        message.content = content.to_string();
        message.edited_at = Some(Utc::now());
        Ok(message.clone())
    }

    async fn delete_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<(), PlatformError> {
        let mut inner = self.inner.write().await;
        let messages =
            inner
                .messages
                .get_mut(channel_id)
                .ok_or_else(|| PlatformError::ChannelNotFound {
                    id: channel_id.to_string(),
                })?;
        let before = messages.len();
        messages.retain(|m| m.id != message_id);
        if messages.len() == before {
            return Err(PlatformError::MessageNotFound {
                channel: channel_id.to_string(),
                id: message_id.to_string(),
            });
        }
        Ok(())
    }

    async fn get_member(&self, member_id: &str) -> Result<Option<Member>, PlatformError> {
        Ok(self.inner.read().await.members.get(member_id).cloned())
    }

    async fn find_role(&self, name: &str) -> Result<Option<Role>, PlatformError> {
        Ok(self
            .inner
            .read()
            .await
            .roles
            .iter()
            .find(|r| r.name == name)
            .cloned())
    }

    async fn add_role(&self, member_id: &str, role: &Role) -> Result<(), PlatformError> {
        let mut inner = self.inner.write().await;
        let member = inner
            .members
            .get_mut(member_id)
            .ok_or_else(|| PlatformError::MemberNotFound {
                id: member_id.to_string(),
            })?;
        if !member.has_role(role) {
            member.roles.push(role.id.clone());
        }
        Ok(())
    }

    async fn remove_role(&self, member_id: &str, role: &Role) -> Result<(), PlatformError> {
        let mut inner = self.inner.write().await;
        let member = inner
            .members
            .get_mut(member_id)
            .ok_or_else(|| PlatformError::MemberNotFound {
                id: member_id.to_string(),
            })?;
        member.roles.retain(|id| id != &role.id);
        Ok(())
    }

    async fn set_nickname(&self, member_id: &str, nickname: &str) -> Result<(), PlatformError> {
        let mut inner = self.inner.write().await;
        if inner.fail_nicknames {
            return Err(PlatformError::RequestFailed {
                action: "set_nickname".to_string(),
                reason: "missing permissions".to_string(),
            });
        }
        let member = inner
            .members
            .get_mut(member_id)
            .ok_or_else(|| PlatformError::MemberNotFound {
                id: member_id.to_string(),
            })?;
        member.nickname = Some(nickname.to_string());
        Ok(())
    }
}
