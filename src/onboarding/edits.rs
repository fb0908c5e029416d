//! Edit reconciliation: what to do when the member edits a message.
//!
//! Planning is pure: [`plan`] looks at the log (already holding the edited
//! content) and the state built from it, and says which notices go stale and
//! how the conversation changed. The manager carries the plan out.

use serde::Serialize;

use super::log::{AuthorRole, MessageLog};
use super::prompts;
use super::questions::QuestionKey;
use super::state::{ConversationState, Validity};
use crate::platform::Message;

/// Whether any accepted answer is currently broken by an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditStatus {
    Clean,
    HasEditErrors,
}

impl EditStatus {
    pub fn of(state: &ConversationState) -> Self {
        if state.has_edit_errors() {
            Self::HasEditErrors
        } else {
            Self::Clean
        }
    }
}

impl std::fmt::Display for EditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::HasEditErrors => write!(f, "has_edit_errors"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditKind {
    /// The edited message answers the outstanding question; treat it as a
    /// freshly sent answer.
    Outstanding,
    /// An accepted answer became invalid. `notice` goes into the channel.
    Broken { notice: String },
    /// An accepted answer is valid (again).
    Repaired {
        value: String,
        before: EditStatus,
        after: EditStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditPlan {
    pub question: QuestionKey,
    /// Ids of earlier edit notices for this question, to delete.
    pub stale_notices: Vec<String>,
    pub kind: EditKind,
}

/// The edit notice text for a question.
pub fn notice_for(question: QuestionKey) -> String {
    prompts::edit_error_notice(question.error_text())
}

/// Edit notices in the log for `question`, newest first.
pub fn notices_for<'a>(question: QuestionKey, log: &'a MessageLog) -> Vec<&'a Message> {
    let notice = notice_for(question);
    log.by_role(AuthorRole::Bot)
        .filter(|m| m.content == notice)
        .collect()
}

/// Plan the reaction to an edit of `message_id`. `None` when the message is
/// not the live answer to any question.
pub fn plan(message_id: &str, log: &MessageLog, state: &ConversationState) -> Option<EditPlan> {
    let question = state.question_answered_by(message_id)?;
    let entry = state.entry(question);
    let accepted = entry.answer.as_ref().is_some_and(|a| a.accepted);

    if !accepted {
        return Some(EditPlan {
            question,
            stale_notices: Vec::new(),
            kind: EditKind::Outstanding,
        });
    }

    let stale_notices: Vec<String> = notices_for(question, log)
        .into_iter()
        .map(|m| m.id.clone())
        .collect();

    let kind = match &entry.validity {
        Validity::Invalid { error } => EditKind::Broken {
            notice: prompts::edit_error_notice(error),
        },
        Validity::Valid { value } => {
            let before = if log
                .by_role(AuthorRole::Bot)
                .any(|m| prompts::is_edit_error_notice(&m.content))
            {
                EditStatus::HasEditErrors
            } else {
                EditStatus::Clean
            };
            EditKind::Repaired {
                value: value.clone(),
                before,
                after: EditStatus::of(state),
            }
        }
        // A resolved answer always has a validity.
        Validity::Absent => return None,
    };

    Some(EditPlan {
        question,
        stale_notices,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::config::OnboardingConfig;
    use crate::platform::Author;

    fn log(entries: &[(&str, String)]) -> MessageLog {
        let messages = entries
            .iter()
            .enumerate()
            .rev()
            .map(|(i, (author, content))| Message {
                id: format!("m{i}"),
                channel_id: "c".into(),
                author: Author {
                    id: (*author).into(),
                    name: (*author).into(),
                    bot: *author == "bot",
                },
                content: content.clone(),
                created_at: Utc::now(),
                edited_at: None,
            })
            .collect();
        MessageLog::new(messages, "bot", "member")
    }

    fn conversation(email: &str, conduct: &str, extra: &[(&str, String)]) -> Vec<(&'static str, String)> {
        let config = OnboardingConfig::default();
        let mut entries = vec![
            ("bot", prompts::NAME_PROMPT.to_string()),
            ("member", "Fred".to_string()),
            ("bot", prompts::name_ack("Fred")),
            ("bot", prompts::EMAIL_PROMPT.to_string()),
            ("member", email.to_string()),
            ("bot", prompts::email_ack("fred@example.com", false)),
            ("bot", prompts::conduct_prompt(&config)),
            ("member", conduct.to_string()),
            ("bot", prompts::CONDUCT_ACK.to_string()),
            ("bot", prompts::CONTACT_PROMPT.to_string()),
        ];
        for (author, content) in extra {
            let author: &'static str = if *author == "bot" { "bot" } else { "member" };
            entries.push((author, content.clone()));
        }
        entries
    }

    fn build(entries: &[(&str, String)]) -> (MessageLog, ConversationState) {
        let log = log(entries);
        let state = ConversationState::build(&log, &OnboardingConfig::default());
        (log, state)
    }

    #[test]
    fn editing_a_valid_answer_into_an_invalid_one_breaks_it() {
        let (log, state) = build(&conversation("not an email", "yes", &[]));
        let plan = plan("m4", &log, &state).unwrap();
        assert_eq!(plan.question, QuestionKey::Email);
        assert_eq!(
            plan.kind,
            EditKind::Broken {
                notice: notice_for(QuestionKey::Email)
            }
        );
        assert_eq!(EditStatus::of(&state), EditStatus::HasEditErrors);
    }

    #[test]
    fn fixing_one_of_two_errors_stays_dirty() {
        let notice = notice_for(QuestionKey::Email);
        let (log, state) = build(&conversation(
            "fred@acme.com",
            "No",
            &[
                ("bot", notice.clone()),
                ("bot", notice_for(QuestionKey::CodeOfConduct)),
            ],
        ));
        let plan = plan("m4", &log, &state).unwrap();
        assert_eq!(plan.stale_notices, vec!["m10".to_string()]);
        assert_eq!(
            plan.kind,
            EditKind::Repaired {
                value: "fred@acme.com".into(),
                before: EditStatus::HasEditErrors,
                after: EditStatus::HasEditErrors,
            }
        );
    }

    #[test]
    fn fixing_the_last_error_is_clean() {
        let (log, state) = build(&conversation(
            "fred@acme.com",
            "Yes",
            &[("bot", notice_for(QuestionKey::CodeOfConduct))],
        ));
        let plan = plan("m7", &log, &state).unwrap();
        assert_eq!(plan.question, QuestionKey::CodeOfConduct);
        assert_eq!(plan.stale_notices, vec!["m10".to_string()]);
        assert!(matches!(
            plan.kind,
            EditKind::Repaired {
                before: EditStatus::HasEditErrors,
                after: EditStatus::Clean,
                ..
            }
        ));
    }

    #[test]
    fn outstanding_answers_are_handled_as_new() {
        let (log, state) = build(&conversation(
            "fred@example.com",
            "yes",
            &[("member", "wrong@example.com".to_string())],
        ));
        let plan = plan("m10", &log, &state).unwrap();
        assert_eq!(plan.question, QuestionKey::ConductContact);
        assert_eq!(plan.kind, EditKind::Outstanding);
    }

    #[test]
    fn superseded_messages_are_ignored() {
        let mut entries = conversation("fred@example.com", "yes", &[]);
        entries.insert(4, ("member", "not an email".to_string()));
        entries.insert(5, ("bot", QuestionKey::Email.error_text().to_string()));
        let (log, state) = build(&entries);
        assert_eq!(plan("m4", &log, &state), None);
        assert_eq!(plan("m0", &log, &state), None);
    }
}
