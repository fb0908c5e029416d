//! Conversation state, derived from the channel log on every event.
//!
//! Nothing here is persisted. [`ConversationState::build`] is a pure fold over
//! the log, so rebuilding from an unchanged log yields an identical state.

use std::collections::BTreeMap;

use serde::Serialize;

use super::log::MessageLog;
use super::questions::{Phase, PromptVars, QuestionKey};
use super::resolver::{self, Answer, Pending};
use crate::config::OnboardingConfig;

/// Validity of a question's live answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Validity {
    Absent,
    Valid { value: String },
    Invalid { error: String },
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

/// One question with its live answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerEntry {
    pub question: QuestionKey,
    /// Whether a prompt for this question was ever sent.
    pub prompted: bool,
    /// The bot has moved past this question's latest prompt.
    pub closed: bool,
    pub answer: Option<Answer>,
    pub validity: Validity,
}

impl AnswerEntry {
    /// Accepted by the bot and still valid.
    pub fn is_settled(&self) -> bool {
        self.closed && self.validity.is_valid()
    }

    /// Accepted by the bot but edited into an invalid value, or removed, since.
    pub fn is_edit_error(&self) -> bool {
        self.closed && !self.validity.is_valid()
    }
}

/// Snapshot of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationState {
    /// One entry per question, in conversation order.
    pub entries: Vec<AnswerEntry>,
    pub pending: Pending,
    /// Index of the first question without a settled answer. Questions that
    /// were skipped (never prompted, with a later question prompted) don't count.
    pub next_index: Option<usize>,
    /// Accepted answers that are currently invalid.
    pub edit_errors: Vec<QuestionKey>,
    /// The bot moved past the final confirmation and every required question
    /// before it, so membership has been granted.
    pub admitted: bool,
    /// Every required question, final confirmation included, is settled.
    pub complete: bool,
}

impl ConversationState {
    pub fn build(log: &MessageLog, config: &OnboardingConfig) -> Self {
        let entries: Vec<AnswerEntry> = QuestionKey::ALL
            .into_iter()
            .map(|question| {
                let answer = resolver::resolve(question, log);
                let validity = match &answer {
                    None => Validity::Absent,
                    Some(a) => match question.validate(&a.content, config) {
                        Ok(value) => Validity::Valid { value },
                        Err(e) => Validity::Invalid { error: e.0 },
                    },
                };
                AnswerEntry {
                    question,
                    prompted: resolver::was_prompted(question, log),
                    closed: resolver::window_closed(question, log),
                    answer,
                    validity,
                }
            })
            .collect();

        let skipped = |index: usize| {
            !entries[index].prompted && entries[index + 1..].iter().any(|e| e.prompted)
        };
        let next_index =
            (0..entries.len()).find(|&i| !entries[i].is_settled() && !skipped(i));

        let edit_errors = entries
            .iter()
            .filter(|e| e.is_edit_error())
            .map(|e| e.question)
            .collect();

        let admitted = entries[..=QuestionKey::Confirm.index()]
            .iter()
            .filter(|e| e.question.phase() == Phase::Required)
            .all(|e| e.closed);

        let complete = entries
            .iter()
            .filter(|e| e.question.phase() == Phase::Required)
            .all(AnswerEntry::is_settled);

        Self {
            entries,
            pending: resolver::pending(log),
            next_index,
            edit_errors,
            admitted,
            complete,
        }
    }

    pub fn entry(&self, question: QuestionKey) -> &AnswerEntry {
        &self.entries[question.index()]
    }

    /// The validated value of a question's live answer.
    pub fn value(&self, question: QuestionKey) -> Option<&str> {
        match &self.entry(question).validity {
            Validity::Valid { value } => Some(value),
            _ => None,
        }
    }

    pub fn has_edit_errors(&self) -> bool {
        !self.edit_errors.is_empty()
    }

    /// Every required question before the final confirmation is settled and
    /// nothing accepted has been broken since.
    pub fn ready_to_admit(&self) -> bool {
        !self.has_edit_errors()
            && self.entries[..QuestionKey::Confirm.index()]
                .iter()
                .filter(|e| e.question.phase() == Phase::Required)
                .all(AnswerEntry::is_settled)
    }

    /// The question `message_id` is the live answer to.
    pub fn question_answered_by(&self, message_id: &str) -> Option<QuestionKey> {
        self.entries
            .iter()
            .find(|e| e.answer.as_ref().is_some_and(|a| a.message_id == message_id))
            .map(|e| e.question)
    }

    /// The next question to ask, if any remain.
    pub fn next_question(&self) -> Option<QuestionKey> {
        self.next_index.map(|i| QuestionKey::ALL[i])
    }

    /// Answer text for prompt rendering (trimmed, whether valid or not).
    pub fn answer_texts(&self) -> BTreeMap<QuestionKey, String> {
        self.entries
            .iter()
            .filter_map(|e| {
                let answer = e.answer.as_ref()?;
                Some((e.question, e.question.extract(&answer.content)?))
            })
            .collect()
    }

    /// Prompt variables seeded with the current answers.
    pub fn prompt_vars(&self) -> PromptVars {
        PromptVars {
            answers: self.answer_texts(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use proptest::prelude::*;

    use super::*;
    use crate::onboarding::prompts;
    use crate::platform::{Author, Message};

    fn config() -> OnboardingConfig {
        OnboardingConfig::default()
    }

    /// Build a log from `(author, content)` pairs given oldest first.
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

    fn bot(text: impl Into<String>) -> (&'static str, String) {
        ("bot", text.into())
    }

    fn member(text: impl Into<String>) -> (&'static str, String) {
        ("member", text.into())
    }

    fn through_summary() -> Vec<(&'static str, String)> {
        vec![
            bot(prompts::NAME_PROMPT),
            member("Fred"),
            bot(prompts::name_ack("Fred")),
            bot(prompts::EMAIL_PROMPT),
            member("fred@example.com"),
            bot(prompts::email_ack("fred@example.com", false)),
            bot(prompts::conduct_prompt(&config())),
            member("yes"),
            bot(prompts::CONDUCT_ACK),
            bot(prompts::CONTACT_PROMPT),
            member("team@kentcdodds.com"),
            bot(prompts::CONTACT_ACK),
            bot(prompts::summary("Fred", "fred@example.com")),
        ]
    }

    #[test]
    fn empty_log_starts_at_first_question() {
        let state = ConversationState::build(&log(&[]), &config());
        assert_eq!(state.pending, Pending::NotStarted);
        assert_eq!(state.next_question(), Some(QuestionKey::Name));
        assert!(!state.complete);
        assert!(!state.admitted);
    }

    #[test]
    fn invalid_answer_does_not_advance() {
        let state = ConversationState::build(
            &log(&[
                bot(prompts::NAME_PROMPT),
                member("Fred"),
                bot(prompts::name_ack("Fred")),
                bot(prompts::EMAIL_PROMPT),
                member("not an email"),
            ]),
            &config(),
        );
        assert_eq!(state.next_question(), Some(QuestionKey::Email));
        assert_eq!(
            state.entry(QuestionKey::Email).validity,
            Validity::Invalid {
                error: QuestionKey::Email.error_text().to_string()
            }
        );
        assert!(!state.has_edit_errors());
    }

    #[test]
    fn summary_stage_is_not_complete_until_confirmed() {
        let mut entries = through_summary();
        let state = ConversationState::build(&log(&entries), &config());
        assert_eq!(state.next_question(), Some(QuestionKey::Confirm));
        assert!(!state.complete);

        entries.push(member("yes"));
        entries.push(bot(prompts::confirm_ack(&config())));
        entries.push(bot(prompts::avatar_prompt(None)));
        let state = ConversationState::build(&log(&entries), &config());
        assert!(state.complete);
        assert!(state.admitted);
        assert_eq!(state.next_question(), Some(QuestionKey::Avatar));
    }

    #[test]
    fn edited_earlier_answer_is_an_edit_error() {
        let mut entries = through_summary();
        entries[4] = member("not an email");
        let state = ConversationState::build(&log(&entries), &config());
        assert_eq!(state.edit_errors, vec![QuestionKey::Email]);
        assert_eq!(state.next_question(), Some(QuestionKey::Email));
        // The member is still nominally on the confirmation.
        assert_eq!(state.pending, Pending::Question(QuestionKey::Confirm));
        assert_eq!(state.question_answered_by("m4"), Some(QuestionKey::Email));
    }

    #[test]
    fn removed_accepted_answer_is_an_edit_error() {
        let mut entries = through_summary();
        entries.remove(4);
        let state = ConversationState::build(&log(&entries), &config());
        assert_eq!(state.entry(QuestionKey::Email).validity, Validity::Absent);
        assert_eq!(state.edit_errors, vec![QuestionKey::Email]);
        assert!(!state.ready_to_admit());

        entries.push(member("yes"));
        let state = ConversationState::build(&log(&entries), &config());
        assert!(!state.ready_to_admit());
        assert!(!state.admitted);
    }

    #[test]
    fn ready_to_admit_at_the_summary() {
        let state = ConversationState::build(&log(&through_summary()), &config());
        assert!(state.ready_to_admit());
        assert!(!state.admitted);
    }

    #[test]
    fn confirmation_without_earlier_answers_does_not_admit() {
        let entries = vec![
            bot(prompts::summary("Fred", "fred@example.com")),
            member("yes"),
            bot(prompts::confirm_ack(&config())),
            bot(prompts::avatar_prompt(None)),
        ];
        let state = ConversationState::build(&log(&entries), &config());
        assert!(state.entry(QuestionKey::Confirm).is_settled());
        assert!(!state.admitted);
        assert!(!state.complete);
    }

    #[test]
    fn skipped_avatar_is_not_next() {
        let mut entries = through_summary();
        entries.push(member("yes"));
        entries.push(bot(prompts::confirm_ack(&config())));
        entries.push(bot(prompts::live_stream_prompt("<#1>")));
        let state = ConversationState::build(&log(&entries), &config());
        assert_eq!(state.next_question(), Some(QuestionKey::LiveStream));
    }

    #[test]
    fn answer_texts_feed_the_summary() {
        let state = ConversationState::build(&log(&through_summary()), &config());
        let vars = state.prompt_vars();
        assert_eq!(vars.answers[&QuestionKey::Name], "Fred");
        assert_eq!(
            QuestionKey::Confirm.prompt(&config(), &vars),
            prompts::summary("Fred", "fred@example.com")
        );
    }

    fn arb_entry() -> impl Strategy<Value = (&'static str, String)> {
        let config = config();
        prop_oneof![
            prop::sample::select(QuestionKey::ALL.to_vec()).prop_map(move |q| {
                let vars = PromptVars::default();
                bot(q.prompt(&config, &vars))
            }),
            Just(bot(prompts::closing("<#1>"))),
            Just(bot(prompts::EDIT_GATE)),
            prop::sample::select(vec![
                "Fred", "", "yes", "No", "done", "fred@example.com", "not an email",
                "team@kentcdodds.com", "delete",
            ])
            .prop_map(|s| member(s)),
            "[a-z @.]{0,12}".prop_map(|s| ("moderator", s)),
        ]
    }

    proptest! {
        #[test]
        fn rebuilding_is_idempotent(entries in prop::collection::vec(arb_entry(), 0..30)) {
            let log = log(&entries);
            let first = ConversationState::build(&log, &config());
            let second = ConversationState::build(&log, &config());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn complete_implies_admitted_and_clean_required_answers(
            entries in prop::collection::vec(arb_entry(), 0..30)
        ) {
            let state = ConversationState::build(&log(&entries), &config());
            if state.complete {
                prop_assert!(state.admitted);
                for q in QuestionKey::ALL.iter().filter(|q| q.phase() == Phase::Required) {
                    prop_assert!(state.value(*q).is_some());
                }
            }
        }

        #[test]
        fn admitted_implies_required_answers_or_edit_errors(
            entries in prop::collection::vec(arb_entry(), 0..30)
        ) {
            let state = ConversationState::build(&log(&entries), &config());
            if state.admitted {
                for q in QuestionKey::ALL[..QuestionKey::Confirm.index()]
                    .iter()
                    .filter(|q| q.phase() == Phase::Required)
                {
                    prop_assert!(
                        state.value(*q).is_some() || state.edit_errors.contains(q),
                        "{q} has no value and is not flagged"
                    );
                }
                if !state.has_edit_errors() {
                    prop_assert!(state.ready_to_admit());
                }
            }
        }
    }
}
