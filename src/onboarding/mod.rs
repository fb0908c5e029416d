//! Onboarding conversation engine.
//!
//! A new member gets a private welcome channel where the bot asks a fixed
//! sequence of questions. The conversation has no stored state: each event
//! re-reads the channel and rebuilds a [`ConversationState`] from it, so
//! answers can be edited at any time and the bot reconciles the change.

pub mod edits;
pub mod log;
pub mod manager;
pub mod prompts;
pub mod questions;
pub mod resolver;
pub mod state;

pub use edits::{EditKind, EditPlan, EditStatus};
pub use log::{AuthorRole, MessageLog};
pub use manager::OnboardingManager;
pub use questions::{AcceptHook, Phase, PromptVars, QuestionKey, ValidationError};
pub use resolver::{Answer, Pending};
pub use state::{AnswerEntry, ConversationState, Validity};
