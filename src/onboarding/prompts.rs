//! Every piece of text the bot sends during onboarding.
//!
//! Prompts are recognised again later by their opening words (see
//! `QuestionKey::is_prompt`), so edits to a prompt's first line must keep
//! the matching prefix in sync.

use crate::config::OnboardingConfig;

pub const NAME_PROMPT: &str = "What's your first name?";

pub const EMAIL_PROMPT: &str = "What's your email address? (This will add you to Kent's mailing list. You will receive a confirmation email.)";

pub(crate) const CONDUCT_PREFIX: &str = "Our community is commited to certain standards of behavior";

pub const CONTACT_PROMPT: &str = "**Based on what you read in the Code of Conduct**, what's the email address you send Code of Conduct concerns and violations to? (If you're not sure, open the code of conduct to find out).";

pub(crate) const SUMMARY_PREFIX: &str = "Here are your answers:";

pub(crate) const AVATAR_PREFIX: &str = "It's more fun here when folks have an avatar.";

pub(crate) const LIVE_STREAM_PREFIX: &str = "Would you like to be notified when Kent starts live streaming";

pub(crate) const NOTIFY_PREFIX: &str = "Would you like to be notified when Kent starts ";

pub(crate) const CLOSING_PREFIX: &str = "Looks like we're all done! Go explore!";

pub const EDIT_ERROR_PREFIX: &str =
    "There's a problem with an edit that was just made. Please edit the answer again to fix it. ";

pub const EDIT_FIXED: &str = "Thanks for fixing things up, now we can continue.";

pub const EDIT_GATE: &str = "There are existing errors with your previous answers, please edit your answer above before continuing.";

pub const ALL_DONE_REPLY: &str = "We're all done. This channel will get deleted automatically eventually, but if you want to delete it yourself, then say \"delete\".";

pub const SEPARATOR: &str = "━━━━━━━━━━━━━━━━━━━━\n\n**If you wanna hang out here for a bit longer, I have a few questions that will help you get set up in this server a bit more.**";

/// First message in a fresh welcome channel.
pub fn welcome(config: &OnboardingConfig, mention: &str, tag: &str) -> String {
    format!(
        "Hello {mention} 👋\n\n\
I'm a bot and I'm here to welcome you to the {community}! Before you can join in the fun, I need to ask you a few questions. \
If you have any trouble, please email {contact} with your discord username (`{tag}`) and we'll get things fixed up for you.\n\n\
(Note, if you make a mistake, you can edit your responses).\n\n\
In less than 5 minutes, you'll have full access to this server. So, let's get started! Here's the first question:",
        community = config.community_name,
        contact = config.contact_email,
    )
}

pub fn conduct_prompt(config: &OnboardingConfig) -> String {
    format!(
        "{CONDUCT_PREFIX} and we enforce that behavior to ensure it's a nice place to spend time.\n\n\
Please read about our code of conduct here: {url}\n\n\
Do you agree to abide by and uphold the code of conduct? **The only correct answer is \"yes\"**",
        url = config.code_of_conduct_url,
    )
}

/// The final confirmation prompt.
pub fn summary(name: &str, email: &str) -> String {
    format!(
        "{SUMMARY_PREFIX}\n  First Name: {name}\n  Email: {email}\n  Accepted Code of Conduct: Yes\n\n\
If you'd like to change any, then edit your responses above.\n\n\
**If everything's correct, simply reply \"yes\"**."
    )
}

pub fn avatar_prompt(image_url: Option<&str>) -> String {
    let suggestion = image_url
        .map(|url| {
            format!(
                "I got this image using your email address with gravatar.com. You can use it for your avatar if you like.\n\n{url}\n\n"
            )
        })
        .unwrap_or_default();
    format!(
        "{AVATAR_PREFIX} You can go ahead and set yours now 😄\n\n\
{suggestion}\
Here's how you set your avatar: https://support.discord.com/hc/en-us/articles/204156688-How-do-I-change-my-avatar-\n\n\
**When you're finished (or if you'd like to just move on), just say \"done\"**"
    )
}

pub fn live_stream_prompt(channel: &str) -> String {
    format!("{LIVE_STREAM_PREFIX} in {channel}?")
}

pub fn office_hours_prompt(config: &OnboardingConfig, channel: &str) -> String {
    format!("{NOTIFY_PREFIX}{} in {channel}?", config.office_hours_url)
}

/// Sent after the last optional question.
pub fn closing(introductions: &str) -> String {
    format!(
        "{CLOSING_PREFIX}\n\n\
We'd love to get to know you a bit. Tell us about you in {introductions}. Here's a template you can use:\n\n\
🌐 I'm from:\n🏢 I work at:\n💻 I work with this tech:\n🍎 I snack on:\n🤪 I'm unique because:\n\n\
Enjoy the community!"
    )
}

pub fn is_closing(text: &str) -> bool {
    text.starts_with(CLOSING_PREFIX)
}

pub fn edit_error_notice(error: &str) -> String {
    format!("{EDIT_ERROR_PREFIX}{error}")
}

pub fn is_edit_error_notice(text: &str) -> bool {
    text.starts_with(EDIT_ERROR_PREFIX)
}

// ── Acknowledgements ────────────────────────────────────────────────

pub fn name_ack(name: &str) -> String {
    format!("Great, hi {name} 👋")
}

pub fn nickname_notice(nickname: &str, previous: &str) -> String {
    format!(
        "_I've changed your nickname on this server to {nickname}. If you'd like to change it back then type: `/nick {previous}`_"
    )
}

pub fn email_ack(email: &str, already_subscribed: bool) -> String {
    if already_subscribed {
        format!(
            "Oh, nice, {email} is already a part of Kent's mailing list (you rock 🤘), so you won't be getting a confirmation email after all."
        )
    } else {
        format!("Awesome, when we're done here, you'll receive a confirmation email to: {email}.")
    }
}

pub const CONDUCT_ACK: &str = "Great, thanks for helping us keep this an awesome place to be.";

pub const CONTACT_ACK: &str = "That's right!";

pub fn confirm_ack(config: &OnboardingConfig) -> String {
    format!("Awesome, welcome to the {}!", config.community_name)
}

pub fn completion(email: &str, already_subscribed: bool) -> String {
    let reminder = if already_subscribed {
        String::new()
    } else {
        format!("Don't forget to check {email} for a confirmation email. 📬")
    };
    format!(
        "🎉 You should be good to go now. {reminder}\n\n🎊 You now have access to the whole server. Welcome!"
    )
}

pub fn avatar_ack(has_avatar: bool) -> &'static str {
    if has_avatar {
        "Great, thanks for adding your avatar."
    } else {
        "Ok, please do set your avatar later though. It helps keep everything human."
    }
}

pub fn live_stream_ack(notify: bool) -> &'static str {
    if notify {
        "Cool, when Kent starts live streaming, you'll get notified."
    } else {
        "Ok, you won't be notified when Kent starts live streaming."
    }
}

pub fn office_hours_ack(notify: bool) -> &'static str {
    if notify {
        "Great, you'll be notified when Kent's Office Hours start."
    } else {
        "No worries, you won't be notified about Kent's Office Hours."
    }
}
