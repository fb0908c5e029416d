//! The fixed, ordered list of onboarding questions.
//!
//! Each question is a variant of [`QuestionKey`]; extraction, validation,
//! prompt rendering and the acceptance hook are matched per variant.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::prompts;
use crate::config::OnboardingConfig;
use crate::platform::Member;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Identity of a question. Declaration order is conversation order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKey {
    Name,
    Email,
    CodeOfConduct,
    ConductContact,
    /// Final confirmation echoing the summary of earlier answers.
    Confirm,
    Avatar,
    LiveStream,
    OfficeHours,
}

/// Required questions gate admission; optional ones come after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Required,
    Optional,
}

/// What accepting an answer does beyond acknowledging it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptHook {
    /// Change the member's server nickname to the answer.
    SetNickname,
    /// Ask the mailing list whether the address is already subscribed.
    CheckSubscription,
    /// Grant membership and subscribe to the mailing list.
    Admit,
    /// Grant ("yes") or remove ("no") a notification role.
    ToggleRole,
}

impl AcceptHook {
    /// Whether the hook runs again when an accepted answer is edited.
    pub fn reapply_on_edit(self) -> bool {
        !matches!(self, Self::Admit)
    }
}

/// A rejected answer. The text is sent to the member verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Values interpolated into prompts that are resolved outside the registry.
#[derive(Debug, Clone, Default)]
pub struct PromptVars {
    /// Current answer text per question.
    pub answers: BTreeMap<QuestionKey, String>,
    pub avatar_url: Option<String>,
    pub live_stream_channel: String,
    pub office_hours_channel: String,
}

impl std::fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::CodeOfConduct => "code_of_conduct",
            Self::ConductContact => "conduct_contact",
            Self::Confirm => "confirm",
            Self::Avatar => "avatar",
            Self::LiveStream => "live_stream",
            Self::OfficeHours => "office_hours",
        };
        write!(f, "{s}")
    }
}

fn is_yes(raw: &str) -> bool {
    raw.eq_ignore_ascii_case("yes")
}

fn yes_no(raw: &str) -> Option<&'static str> {
    match raw.to_ascii_lowercase().as_str() {
        "yes" | "y" => Some("yes"),
        "no" | "n" => Some("no"),
        _ => None,
    }
}

impl QuestionKey {
    pub const ALL: [QuestionKey; 8] = [
        Self::Name,
        Self::Email,
        Self::CodeOfConduct,
        Self::ConductContact,
        Self::Confirm,
        Self::Avatar,
        Self::LiveStream,
        Self::OfficeHours,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn phase(self) -> Phase {
        if self <= Self::Confirm {
            Phase::Required
        } else {
            Phase::Optional
        }
    }

    /// The question after this one, if any.
    pub fn next(self) -> Option<QuestionKey> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// Optional steps that don't apply to this member.
    pub fn should_skip(self, member: &Member) -> bool {
        matches!(self, Self::Avatar) && member.has_avatar
    }

    /// Normalise raw message text. `None` means there is nothing to validate.
    pub fn extract(self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// The single error text this question produces.
    pub fn error_text(self) -> &'static str {
        match self {
            Self::Name => "You must provide a first name. What's your first name?",
            Self::Email => {
                "That doesn't look like an email address. Please provide a proper email address."
            }
            Self::CodeOfConduct => {
                "You must agree to the code of conduct to join this community. Do you agree to abide by and uphold the code of conduct? (The answer must be \"yes\")"
            }
            Self::ConductContact => {
                "That's not right. Please open the code of conduct to find out. You're looking for the email address listed for reporting concerns and violations."
            }
            Self::Confirm => {
                "Feel free to edit any of your answers. Please reply \"yes\" when everything is correct."
            }
            Self::Avatar => {
                "Whenever you're ready to move on, just say \"done\"."
            }
            Self::LiveStream => {
                "Please reply \"yes\" or \"no\" to let me know if you'd like live stream notifications."
            }
            Self::OfficeHours => {
                "Please reply \"yes\" or \"no\" to let me know if you'd like office hours notifications."
            }
        }
    }

    /// Validate raw message text, returning the normalised answer value.
    pub fn validate(self, raw: &str, config: &OnboardingConfig) -> Result<String, ValidationError> {
        let reject = || ValidationError(self.error_text().to_string());
        let value = self.extract(raw).ok_or_else(reject)?;

        match self {
            Self::Name => Ok(value),
            Self::Email if EMAIL_RE.is_match(&value) => Ok(value),
            Self::CodeOfConduct | Self::Confirm if is_yes(&value) => Ok("yes".to_string()),
            Self::ConductContact if value.eq_ignore_ascii_case(&config.contact_email) => {
                Ok(value.to_lowercase())
            }
            Self::Avatar if value.eq_ignore_ascii_case("done") => Ok("done".to_string()),
            Self::LiveStream | Self::OfficeHours => {
                yes_no(&value).map(str::to_string).ok_or_else(reject)
            }
            _ => Err(reject()),
        }
    }

    pub fn on_accept(self) -> Option<AcceptHook> {
        match self {
            Self::Name => Some(AcceptHook::SetNickname),
            Self::Email => Some(AcceptHook::CheckSubscription),
            Self::Confirm => Some(AcceptHook::Admit),
            Self::LiveStream | Self::OfficeHours => Some(AcceptHook::ToggleRole),
            Self::CodeOfConduct | Self::ConductContact | Self::Avatar => None,
        }
    }

    /// Render the prompt message for this question.
    pub fn prompt(self, config: &OnboardingConfig, vars: &PromptVars) -> String {
        let answer = |key: QuestionKey| vars.answers.get(&key).map(String::as_str).unwrap_or("");
        match self {
            Self::Name => prompts::NAME_PROMPT.to_string(),
            Self::Email => prompts::EMAIL_PROMPT.to_string(),
            Self::CodeOfConduct => prompts::conduct_prompt(config),
            Self::ConductContact => prompts::CONTACT_PROMPT.to_string(),
            Self::Confirm => prompts::summary(answer(Self::Name), answer(Self::Email)),
            Self::Avatar => prompts::avatar_prompt(vars.avatar_url.as_deref()),
            Self::LiveStream => prompts::live_stream_prompt(&vars.live_stream_channel),
            Self::OfficeHours => prompts::office_hours_prompt(config, &vars.office_hours_channel),
        }
    }

    /// Whether a bot message is an instance of this question's prompt.
    pub fn is_prompt(self, text: &str) -> bool {
        match self {
            Self::Name => text == prompts::NAME_PROMPT,
            Self::Email => text == prompts::EMAIL_PROMPT,
            Self::CodeOfConduct => text.starts_with(prompts::CONDUCT_PREFIX),
            Self::ConductContact => text == prompts::CONTACT_PROMPT,
            Self::Confirm => text.starts_with(prompts::SUMMARY_PREFIX),
            Self::Avatar => text.starts_with(prompts::AVATAR_PREFIX),
            Self::LiveStream => text.starts_with(prompts::LIVE_STREAM_PREFIX),
            Self::OfficeHours => {
                text.starts_with(prompts::NOTIFY_PREFIX)
                    && !text.starts_with(prompts::LIVE_STREAM_PREFIX)
            }
        }
    }

    /// The question a bot message prompts for, if it is a prompt.
    pub fn from_prompt(text: &str) -> Option<QuestionKey> {
        Self::ALL.into_iter().find(|q| q.is_prompt(text))
    }
}
