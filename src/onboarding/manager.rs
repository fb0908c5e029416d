//! OnboardingManager: reacts to platform events for welcome channels.
//!
//! Every entry point re-reads the channel, rebuilds the [`ConversationState`]
//! and acts on it. Nothing is cached between events, so processing the same
//! event twice only ever repeats the bot's side of the conversation.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::edits::{self, EditKind, EditStatus};
use super::log::MessageLog;
use super::prompts;
use super::questions::{AcceptHook, QuestionKey};
use super::resolver::{self, Marker, Pending};
use super::state::{ConversationState, Validity};
use crate::avatar::{self, AvatarLookup};
use crate::config::OnboardingConfig;
use crate::error::Result;
use crate::mailing::{MailingList, Subscriber};
use crate::platform::{Channel, ChannelOptions, ChatPlatform, Member, Message};

/// Text that deletes the welcome channel once the member is admitted.
const DELETE_COMMAND: &str = "delete";

/// A welcome channel loaded for one event.
struct Conversation {
    channel: Channel,
    member: Member,
    log: MessageLog,
    state: ConversationState,
}

/// The bot's reaction to an accepted answer.
#[derive(Debug, Clone, Default)]
struct Acceptance {
    ack: String,
    /// Extra messages sent after the acknowledgement.
    notices: Vec<String>,
}

/// Drives onboarding conversations over a [`ChatPlatform`].
pub struct OnboardingManager {
    platform: Arc<dyn ChatPlatform>,
    mailing_list: Arc<dyn MailingList>,
    avatars: Arc<dyn AvatarLookup>,
    config: OnboardingConfig,
}

fn is_delete(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case(DELETE_COMMAND)
}

impl OnboardingManager {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        mailing_list: Arc<dyn MailingList>,
        avatars: Arc<dyn AvatarLookup>,
        config: OnboardingConfig,
    ) -> Self {
        Self {
            platform,
            mailing_list,
            avatars,
            config,
        }
    }

    pub fn config(&self) -> &OnboardingConfig {
        &self.config
    }

    /// Name of the welcome channel for a member, e.g. `👋-welcome-fredjoe_1234`.
    pub fn channel_name(&self, member: &Member) -> String {
        format!(
            "{}{}_{}",
            self.config.channel_prefix,
            member.username.to_lowercase(),
            member.discriminator
        )
    }

    /// Open a welcome channel for a member who just joined and ask the first
    /// question.
    pub async fn on_new_member(&self, member: &Member) -> Result<Channel> {
        self.set_role(member, &self.config.unconfirmed_role, true).await;

        let options = ChannelOptions {
            category: Some(self.config.category_name.clone()),
            topic: Some(format!(
                "Membership application for {} (Member ID: \"{}\")",
                member.tag(),
                member.id
            )),
            member_id: Some(member.id.clone()),
        };
        let channel = self
            .platform
            .create_channel(&self.channel_name(member), options)
            .await?;
        info!(channel = %channel.id, member = %member.id, "Opened welcome channel");

        self.send(&channel, &prompts::welcome(&self.config, &member.mention(), &member.tag()))
            .await?;
        let first = QuestionKey::ALL[0];
        let prompt = first.prompt(&self.config, &Default::default());
        self.send(&channel, &prompt).await?;
        Ok(channel)
    }

    /// Handle a message posted in any channel.
    pub async fn on_new_message(&self, message: &Message) -> Result<()> {
        if message.author.id == self.platform.bot_user_id() {
            return Ok(());
        }
        let Some(conv) = self.load(&message.channel_id).await? else {
            return Ok(());
        };
        if message.author.id != conv.member.id {
            debug!(channel = %conv.channel.id, author = %message.author.id, "Ignoring message from another author");
            return Ok(());
        }

        match conv.state.pending {
            Pending::NotStarted => {
                debug!(channel = %conv.channel.id, "Conversation has not started");
                Ok(())
            }
            Pending::Finished if is_delete(&message.content) => self.delete(&conv).await,
            Pending::Finished => {
                self.send(&conv.channel, prompts::ALL_DONE_REPLY).await?;
                Ok(())
            }
            Pending::Question(_) if conv.state.admitted && is_delete(&message.content) => {
                self.delete(&conv).await
            }
            Pending::Question(question) => self.respond(&conv, question).await,
        }
    }

    /// Handle an edit of a message in any channel.
    pub async fn on_updated_message(&self, old: &Message, new: &Message) -> Result<()> {
        if new.author.id == self.platform.bot_user_id() || old.content == new.content {
            return Ok(());
        }
        let Some(conv) = self.load(&new.channel_id).await? else {
            return Ok(());
        };
        if new.author.id != conv.member.id {
            return Ok(());
        }

        let Some(plan) = edits::plan(&new.id, &conv.log, &conv.state) else {
            debug!(channel = %conv.channel.id, message = %new.id, "Edited message is not a live answer");
            return Ok(());
        };
        info!(
            channel = %conv.channel.id,
            question = %plan.question,
            kind = ?plan.kind,
            "Reconciling edited answer"
        );

        for notice in &plan.stale_notices {
            if let Err(e) = self.platform.delete_message(&conv.channel.id, notice).await {
                warn!(channel = %conv.channel.id, message = %notice, error = %e, "Failed to delete edit notice");
            }
        }

        match plan.kind {
            EditKind::Outstanding => self.respond(&conv, plan.question).await,
            EditKind::Broken { notice } => {
                self.send(&conv.channel, &notice).await?;
                Ok(())
            }
            EditKind::Repaired {
                value,
                before,
                after,
            } => {
                self.repair(&conv, plan.question, &new.id, &value, before, after)
                    .await
            }
        }
    }

    /// Load the conversation a channel holds. `None` for anything that isn't
    /// a welcome channel with a known member.
    async fn load(&self, channel_id: &str) -> Result<Option<Conversation>> {
        let Some(channel) = self.platform.get_channel(channel_id).await? else {
            return Ok(None);
        };
        if !channel.name.starts_with(&self.config.channel_prefix) {
            return Ok(None);
        }
        let Some(member_id) = channel.member_id.clone() else {
            return Ok(None);
        };
        let Some(member) = self.platform.get_member(&member_id).await? else {
            warn!(channel = %channel.id, member = %member_id, "Welcome channel member has left");
            return Ok(None);
        };

        let messages = self.platform.fetch_messages(&channel.id).await?;
        let log = MessageLog::new(messages, self.platform.bot_user_id(), &member.id);
        let state = ConversationState::build(&log, &self.config);
        Ok(Some(Conversation {
            channel,
            member,
            log,
            state,
        }))
    }

    /// Reply to the live answer of the outstanding question.
    async fn respond(&self, conv: &Conversation, question: QuestionKey) -> Result<()> {
        let value = match &conv.state.entry(question).validity {
            Validity::Absent => return Ok(()),
            Validity::Invalid { error } => {
                debug!(channel = %conv.channel.id, question = %question, "Rejected answer");
                self.send(&conv.channel, error).await?;
                return Ok(());
            }
            Validity::Valid { value } => value,
        };

        if question == QuestionKey::Confirm && !conv.state.ready_to_admit() {
            info!(
                channel = %conv.channel.id,
                errors = ?conv.state.edit_errors,
                "Holding confirmation until earlier answers are fixed"
            );
            self.send(&conv.channel, prompts::EDIT_GATE).await?;
            return Ok(());
        }

        let acceptance = self.accept(conv, question, value, false).await;
        self.send(&conv.channel, &acceptance.ack).await?;
        for notice in &acceptance.notices {
            self.send(&conv.channel, notice).await?;
        }

        if question.on_accept() == Some(AcceptHook::Admit) {
            self.admit(conv).await?;
        }
        self.advance(conv, question).await
    }

    /// Run the acceptance hook of `question` and build its acknowledgement.
    /// With `reapply`, hooks that must only run once are skipped.
    async fn accept(
        &self,
        conv: &Conversation,
        question: QuestionKey,
        value: &str,
        reapply: bool,
    ) -> Acceptance {
        let member = &conv.member;
        let mut acceptance = Acceptance::default();
        let mut already_subscribed = false;

        let hook = question
            .on_accept()
            .filter(|hook| !reapply || hook.reapply_on_edit());
        match hook {
            Some(AcceptHook::SetNickname) => {
                let previous = member.nickname.as_deref().unwrap_or(&member.username);
                match self.platform.set_nickname(&member.id, value).await {
                    Ok(()) => acceptance
                        .notices
                        .push(prompts::nickname_notice(value, previous)),
                    Err(e) => {
                        warn!(member = %member.id, error = %e, "Failed to set nickname");
                    }
                }
            }
            Some(AcceptHook::CheckSubscription) => {
                already_subscribed = self.is_subscribed(value).await;
                if reapply && conv.state.admitted {
                    self.subscribe(conv, value).await;
                }
            }
            Some(AcceptHook::ToggleRole) => {
                if let Some(role) = self.notify_role(question) {
                    self.set_role(member, role, value == "yes").await;
                }
            }
            // Admission sends its own messages after the acknowledgement.
            Some(AcceptHook::Admit) | None => {}
        }

        acceptance.ack = match question {
            QuestionKey::Name => prompts::name_ack(value),
            QuestionKey::Email => prompts::email_ack(value, already_subscribed),
            QuestionKey::CodeOfConduct => prompts::CONDUCT_ACK.to_string(),
            QuestionKey::ConductContact => prompts::CONTACT_ACK.to_string(),
            QuestionKey::Confirm => prompts::confirm_ack(&self.config),
            QuestionKey::Avatar => prompts::avatar_ack(member.has_avatar).to_string(),
            QuestionKey::LiveStream => prompts::live_stream_ack(value == "yes").to_string(),
            QuestionKey::OfficeHours => prompts::office_hours_ack(value == "yes").to_string(),
        };
        acceptance
    }

    /// Grant membership and subscribe the member to the mailing list.
    async fn admit(&self, conv: &Conversation) -> Result<()> {
        let member = &conv.member;
        let Some(email) = conv.state.value(QuestionKey::Email) else {
            warn!(channel = %conv.channel.id, member = %member.id, "No valid email at admission");
            return Ok(());
        };
        self.set_role(member, &self.config.member_role, true).await;
        self.set_role(member, &self.config.unconfirmed_role, false).await;

        let already_subscribed = self.is_subscribed(email).await;
        self.subscribe(conv, email).await;
        info!(channel = %conv.channel.id, member = %member.id, "Member admitted");

        self.send(&conv.channel, &prompts::completion(email, already_subscribed))
            .await?;
        self.send(&conv.channel, &self.config.welcome_gif_url).await?;
        self.send(&conv.channel, prompts::SEPARATOR).await?;
        Ok(())
    }

    /// Ask the question after `answered`, or close the conversation.
    async fn advance(&self, conv: &Conversation, answered: QuestionKey) -> Result<()> {
        let next = std::iter::successors(answered.next(), |q| q.next())
            .find(|q| !q.should_skip(&conv.member));
        let text = match next {
            Some(question) => self.render_prompt(question, &conv.state).await,
            None => {
                let introductions = self
                    .channel_mention(&self.config.introductions_channel)
                    .await;
                prompts::closing(&introductions)
            }
        };
        self.send(&conv.channel, &text).await?;
        Ok(())
    }

    /// Carry out a valid edit of an accepted answer.
    async fn repair(
        &self,
        conv: &Conversation,
        question: QuestionKey,
        message_id: &str,
        value: &str,
        before: EditStatus,
        after: EditStatus,
    ) -> Result<()> {
        let acceptance = self.accept(conv, question, value, true).await;

        if let Some(reply) = conv.log.bot_reply_to(message_id)
            && Marker::classify(&reply.content) == Marker::Other
            && reply.content != acceptance.ack
        {
            self.platform
                .edit_message(&conv.channel.id, &reply.id, &acceptance.ack)
                .await?;
        }
        for notice in &acceptance.notices {
            self.send(&conv.channel, notice).await?;
        }

        if let Some(summary) = resolver::latest_prompt(QuestionKey::Confirm, &conv.log) {
            let text = self.render_prompt(QuestionKey::Confirm, &conv.state).await;
            if summary.content != text {
                self.platform
                    .edit_message(&conv.channel.id, &summary.id, &text)
                    .await?;
            }
        }

        if after == EditStatus::HasEditErrors {
            return Ok(());
        }
        match conv.state.pending {
            Pending::Question(pending) => {
                self.send(&conv.channel, prompts::EDIT_FIXED).await?;
                let prompt = self.render_prompt(pending, &conv.state).await;
                self.send(&conv.channel, &prompt).await?;
            }
            Pending::Finished if before == EditStatus::HasEditErrors => {
                self.send(&conv.channel, prompts::EDIT_FIXED).await?;
            }
            Pending::Finished | Pending::NotStarted => {}
        }
        Ok(())
    }

    async fn delete(&self, conv: &Conversation) -> Result<()> {
        info!(channel = %conv.channel.id, member = %conv.member.id, "Deleting welcome channel on request");
        self.platform.delete_channel(&conv.channel.id).await?;
        Ok(())
    }

    // ── Rendering ───────────────────────────────────────────────────

    async fn render_prompt(&self, question: QuestionKey, state: &ConversationState) -> String {
        let mut vars = state.prompt_vars();
        match question {
            QuestionKey::Avatar => {
                vars.avatar_url = match state.value(QuestionKey::Email) {
                    Some(email) => self.avatar_url(email).await,
                    None => None,
                };
            }
            QuestionKey::LiveStream => {
                vars.live_stream_channel =
                    self.channel_mention(&self.config.live_stream_channel).await;
            }
            QuestionKey::OfficeHours => {
                vars.office_hours_channel =
                    self.channel_mention(&self.config.office_hours_channel).await;
            }
            _ => {}
        }
        question.prompt(&self.config, &vars)
    }

    /// Mention markup for a channel, or `#name` when it can't be found.
    async fn channel_mention(&self, name: &str) -> String {
        match self.platform.find_channel(name).await {
            Ok(Some(channel)) => channel.mention(),
            Ok(None) => format!("#{name}"),
            Err(e) => {
                warn!(channel = name, error = %e, "Channel lookup failed");
                format!("#{name}")
            }
        }
    }

    async fn avatar_url(&self, email: &str) -> Option<String> {
        match self.avatars.image_url_for(&avatar::email_hash(email)).await {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Avatar lookup failed");
                None
            }
        }
    }

    // ── Side effects ────────────────────────────────────────────────

    async fn send(&self, channel: &Channel, text: &str) -> Result<Message> {
        Ok(self.platform.send_message(&channel.id, text).await?)
    }

    fn notify_role(&self, question: QuestionKey) -> Option<&str> {
        match question {
            QuestionKey::LiveStream => Some(self.config.live_stream_role.as_str()),
            QuestionKey::OfficeHours => Some(self.config.office_hours_role.as_str()),
            _ => None,
        }
    }

    /// Grant or remove a role by name. Missing roles and failures are logged.
    async fn set_role(&self, member: &Member, name: &str, grant: bool) {
        let role = match self.platform.find_role(name).await {
            Ok(Some(role)) => role,
            Ok(None) => {
                warn!(role = name, "Role is not defined on this server");
                return;
            }
            Err(e) => {
                warn!(role = name, error = %e, "Role lookup failed");
                return;
            }
        };
        let result = match (grant, member.has_role(&role)) {
            (true, false) => self.platform.add_role(&member.id, &role).await,
            (false, true) => self.platform.remove_role(&member.id, &role).await,
            _ => Ok(()),
        };
        if let Err(e) = result {
            warn!(member = %member.id, role = name, grant, error = %e, "Failed to update role");
        }
    }

    /// Mailing-list lookup; failures count as "not subscribed".
    async fn is_subscribed(&self, email: &str) -> bool {
        match self.mailing_list.is_subscribed(email).await {
            Ok(subscribed) => subscribed,
            Err(e) => {
                warn!(error = %e, transient = e.is_transient(), "Subscription lookup failed");
                false
            }
        }
    }

    async fn subscribe(&self, conv: &Conversation, email: &str) {
        let subscriber = Subscriber {
            first_name: conv
                .state
                .value(QuestionKey::Name)
                .unwrap_or_default()
                .to_string(),
            email: email.to_string(),
            fields: BTreeMap::from([("discord_user_id".to_string(), conv.member.id.clone())]),
        };
        if let Err(e) = self.mailing_list.subscribe(&subscriber).await {
            warn!(member = %conv.member.id, error = %e, "Mailing list subscription failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::NoAvatars;
    use crate::mailing::MemoryMailingList;
    use crate::platform::InMemoryPlatform;

    fn member() -> Member {
        Member {
            id: "42".into(),
            username: "FredJoe".into(),
            discriminator: "1234".into(),
            display_name: "Fred Joe".into(),
            nickname: None,
            has_avatar: false,
            roles: Vec::new(),
        }
    }

    fn manager(platform: Arc<InMemoryPlatform>) -> OnboardingManager {
        OnboardingManager::new(
            platform,
            Arc::new(MemoryMailingList::new()),
            Arc::new(NoAvatars),
            OnboardingConfig::default(),
        )
    }

    #[test]
    fn delete_command_is_case_insensitive() {
        assert!(is_delete(" Delete "));
        assert!(!is_delete("please delete"));
    }

    #[tokio::test]
    async fn channel_name_uses_lowercased_tag() {
        let platform = Arc::new(InMemoryPlatform::new("BOT"));
        assert_eq!(
            manager(platform).channel_name(&member()),
            "👋-welcome-fredjoe_1234"
        );
    }

    #[tokio::test]
    async fn missing_roles_do_not_stop_onboarding() {
        let platform = Arc::new(InMemoryPlatform::new("BOT"));
        platform.add_member(member()).await;
        let manager = manager(platform.clone());

        let channel = manager.on_new_member(&member()).await.unwrap();
        assert!(platform.role_names("42").await.is_empty());
        assert_eq!(
            platform.bot_responses(&channel.id).await.last().map(String::as_str),
            Some(prompts::NAME_PROMPT)
        );
    }

    #[tokio::test]
    async fn messages_outside_welcome_channels_are_ignored() {
        let platform = Arc::new(InMemoryPlatform::new("BOT"));
        platform.add_member(member()).await;
        let general = platform.add_channel("general").await;
        let manager = manager(platform.clone());

        let message = platform.post(&general.id, "42", "Fred").await.unwrap();
        manager.on_new_message(&message).await.unwrap();
        assert_eq!(platform.transcript(&general.id).await, "Fred Joe: Fred");
    }

    #[tokio::test]
    async fn bot_messages_are_ignored() {
        let platform = Arc::new(InMemoryPlatform::new("BOT"));
        platform.add_member(member()).await;
        let manager = manager(platform.clone());
        let channel = manager.on_new_member(&member()).await.unwrap();

        let sent = platform.send_message(&channel.id, "hello").await.unwrap();
        manager.on_new_message(&sent).await.unwrap();
        assert_eq!(platform.bot_responses(&channel.id).await.len(), 3);
    }
}
