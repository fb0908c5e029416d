//! Community onboarding bot: welcomes new members in a private channel and
//! admits them once they have answered the onboarding questions.

pub mod avatar;
pub mod config;
pub mod error;
pub mod mailing;
pub mod onboarding;
pub mod platform;
