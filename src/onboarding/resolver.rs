//! Locates the member's live answer to each question.
//!
//! A question's window opens at its most recent prompt and closes at the next
//! prompt of any question (or the closing message). The live answer is the
//! last member message inside the window; earlier attempts in the same window
//! are superseded.

use serde::Serialize;

use super::log::{AuthorRole, MessageLog};
use super::prompts;
use super::questions::QuestionKey;
use crate::platform::Message;

/// What a bot message means to the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Prompt(QuestionKey),
    /// The message sent after the last optional question.
    Closing,
    EditNotice,
    /// Acknowledgements, validation errors, completion text.
    Other,
}

impl Marker {
    pub fn classify(text: &str) -> Self {
        if let Some(q) = QuestionKey::from_prompt(text) {
            Self::Prompt(q)
        } else if prompts::is_closing(text) {
            Self::Closing
        } else if prompts::is_edit_error_notice(text) {
            Self::EditNotice
        } else {
            Self::Other
        }
    }

    /// Markers that end the previous question's window.
    fn is_boundary(self) -> bool {
        matches!(self, Self::Prompt(_) | Self::Closing)
    }
}

/// The member message currently standing as the reply to a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub message_id: String,
    pub content: String,
    /// The bot has moved on past this question's prompt.
    pub accepted: bool,
}

/// Where the conversation is, judged by the latest prompt-like bot message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "question", rename_all = "snake_case")]
pub enum Pending {
    /// No prompt has been sent yet.
    NotStarted,
    /// Waiting on this question.
    Question(QuestionKey),
    /// The closing message has been sent.
    Finished,
}

fn marker_of(log: &MessageLog, message: &Message) -> Option<Marker> {
    (log.role_of(message) == AuthorRole::Bot).then(|| Marker::classify(&message.content))
}

/// Whether any prompt for `question` has been sent.
pub fn was_prompted(question: QuestionKey, log: &MessageLog) -> bool {
    log.by_role(AuthorRole::Bot).any(|m| question.is_prompt(&m.content))
}

/// Messages in the window of `question`'s latest prompt, oldest first, and
/// whether the window has been closed. `None` if it was never prompted.
fn window<'a>(question: QuestionKey, log: &'a MessageLog) -> Option<(Vec<&'a Message>, bool)> {
    let messages: Vec<&Message> = log.chronological().collect();
    let start = messages
        .iter()
        .rposition(|m| marker_of(log, m) == Some(Marker::Prompt(question)))?;

    let window = &messages[start + 1..];
    let end = window
        .iter()
        .position(|m| marker_of(log, m).is_some_and(Marker::is_boundary));
    let closed = end.is_some();
    Some((window[..end.unwrap_or(window.len())].to_vec(), closed))
}

/// Whether the bot has moved past the latest prompt for `question`.
pub fn window_closed(question: QuestionKey, log: &MessageLog) -> bool {
    window(question, log).is_some_and(|(_, closed)| closed)
}

/// The live answer to `question`, or `None` if it is unanswered.
pub fn resolve(question: QuestionKey, log: &MessageLog) -> Option<Answer> {
    let (window, closed) = window(question, log)?;
    let answer = window
        .iter()
        .rev()
        .find(|m| log.role_of(m) == AuthorRole::Member)?;

    Some(Answer {
        message_id: answer.id.clone(),
        content: answer.content.clone(),
        accepted: closed,
    })
}

/// The question the member is currently expected to answer.
pub fn pending(log: &MessageLog) -> Pending {
    log.by_role(AuthorRole::Bot)
        .find_map(|m| match Marker::classify(&m.content) {
            Marker::Prompt(q) => Some(Pending::Question(q)),
            Marker::Closing => Some(Pending::Finished),
            Marker::EditNotice | Marker::Other => None,
        })
        .unwrap_or(Pending::NotStarted)
}

/// The most recent prompt message for `question`.
pub fn latest_prompt<'a>(question: QuestionKey, log: &'a MessageLog) -> Option<&'a Message> {
    log.by_role(AuthorRole::Bot)
        .find(|m| question.is_prompt(&m.content))
}
