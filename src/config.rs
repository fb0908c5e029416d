//! Configuration types.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Community-specific names and links used by the onboarding conversation.
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    /// Name shown in the welcome and completion messages.
    pub community_name: String,
    /// Prefix of every per-member welcome channel. Messages in other channels are ignored.
    pub channel_prefix: String,
    /// Category the welcome channels are created under.
    pub category_name: String,
    /// Role granted on completion.
    pub member_role: String,
    /// Role held while onboarding is in progress.
    pub unconfirmed_role: String,
    /// Role for live-stream notifications.
    pub live_stream_role: String,
    /// Role for office-hours notifications.
    pub office_hours_role: String,
    pub live_stream_channel: String,
    pub office_hours_channel: String,
    pub introductions_channel: String,
    /// Where members report problems and code of conduct violations.
    pub contact_email: String,
    pub code_of_conduct_url: String,
    pub office_hours_url: String,
    pub welcome_gif_url: String,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            community_name: "KCD Community on Discord".to_string(),
            channel_prefix: "👋-welcome-".to_string(),
            category_name: "Welcome!".to_string(),
            member_role: "Member".to_string(),
            unconfirmed_role: "Unconfirmed Member".to_string(),
            live_stream_role: "Notify: Kent Live".to_string(),
            office_hours_role: "Notify: Office Hours".to_string(),
            live_stream_channel: "💻-kent-live".to_string(),
            office_hours_channel: "🏫-office-hours".to_string(),
            introductions_channel: "👶-introductions".to_string(),
            contact_email: "team@kentcdodds.com".to_string(),
            code_of_conduct_url: "https://kentcdodds.com/conduct".to_string(),
            office_hours_url: "https://kcd.im/office-hours".to_string(),
            welcome_gif_url: "https://media.giphy.com/media/MDxjbPCg6DGf8JclbR/giphy.gif"
                .to_string(),
        }
    }
}

impl OnboardingConfig {
    /// Defaults, overridden by any `ONBOARDING_*` environment variables that are set.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Replace each field whose `ONBOARDING_*` key `lookup` finds a non-blank value for.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let overrides: [(&str, &mut String); 14] = [
            ("ONBOARDING_COMMUNITY_NAME", &mut self.community_name),
            ("ONBOARDING_CHANNEL_PREFIX", &mut self.channel_prefix),
            ("ONBOARDING_CATEGORY", &mut self.category_name),
            ("ONBOARDING_MEMBER_ROLE", &mut self.member_role),
            ("ONBOARDING_UNCONFIRMED_ROLE", &mut self.unconfirmed_role),
            ("ONBOARDING_LIVE_STREAM_ROLE", &mut self.live_stream_role),
            ("ONBOARDING_OFFICE_HOURS_ROLE", &mut self.office_hours_role),
            ("ONBOARDING_LIVE_STREAM_CHANNEL", &mut self.live_stream_channel),
            ("ONBOARDING_OFFICE_HOURS_CHANNEL", &mut self.office_hours_channel),
            ("ONBOARDING_INTRODUCTIONS_CHANNEL", &mut self.introductions_channel),
            ("ONBOARDING_CONTACT_EMAIL", &mut self.contact_email),
            ("ONBOARDING_CONDUCT_URL", &mut self.code_of_conduct_url),
            ("ONBOARDING_OFFICE_HOURS_URL", &mut self.office_hours_url),
            ("ONBOARDING_GIF_URL", &mut self.welcome_gif_url),
        ];
        for (key, field) in overrides {
            if let Some(value) = lookup(key)
                && !value.trim().is_empty()
            {
                *field = value;
            }
        }
        self
    }
}

/// ConvertKit credentials and the form members are subscribed to.
#[derive(Debug, Clone)]
pub struct ConvertKitConfig {
    pub api_key: SecretString,
    pub api_secret: SecretString,
    pub form_id: String,
    /// Optional tag applied to every subscriber coming from the community.
    pub tag_id: Option<String>,
}

impl ConvertKitConfig {
    /// Read `CONVERTKIT_API_KEY`, `CONVERTKIT_API_SECRET`, `CONVERTKIT_FORM_ID`
    /// and the optional `CONVERTKIT_TAG_ID`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let required = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let form_id = required("CONVERTKIT_FORM_ID")?;
        if !form_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::InvalidValue {
                key: "CONVERTKIT_FORM_ID".to_string(),
                message: "must be numeric".to_string(),
            });
        }

        Ok(Self {
            api_key: SecretString::from(required("CONVERTKIT_API_KEY")?),
            api_secret: SecretString::from(required("CONVERTKIT_API_SECRET")?),
            form_id,
            tag_id: std::env::var("CONVERTKIT_TAG_ID").ok().filter(|v| !v.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_community() {
        let config = OnboardingConfig::default();
        assert_eq!(config.channel_prefix, "👋-welcome-");
        assert_eq!(config.member_role, "Member");
        assert_eq!(config.contact_email, "team@kentcdodds.com");
    }

    #[test]
    fn every_field_can_be_overridden() {
        let config = OnboardingConfig::default()
            .with_overrides(|key| Some(key.trim_start_matches("ONBOARDING_").to_lowercase()));
        let fields = [
            (&config.community_name, "community_name"),
            (&config.channel_prefix, "channel_prefix"),
            (&config.category_name, "category"),
            (&config.member_role, "member_role"),
            (&config.unconfirmed_role, "unconfirmed_role"),
            (&config.live_stream_role, "live_stream_role"),
            (&config.office_hours_role, "office_hours_role"),
            (&config.live_stream_channel, "live_stream_channel"),
            (&config.office_hours_channel, "office_hours_channel"),
            (&config.introductions_channel, "introductions_channel"),
            (&config.contact_email, "contact_email"),
            (&config.code_of_conduct_url, "conduct_url"),
            (&config.office_hours_url, "office_hours_url"),
            (&config.welcome_gif_url, "gif_url"),
        ];
        for (value, expected) in fields {
            assert_eq!(value, expected);
        }
    }

    #[test]
    fn blank_overrides_keep_defaults() {
        let config = OnboardingConfig::default().with_overrides(|key| match key {
            "ONBOARDING_MEMBER_ROLE" => Some("  ".to_string()),
            "ONBOARDING_OFFICE_HOURS_ROLE" => Some("Notify: Streams".to_string()),
            _ => None,
        });
        assert_eq!(config.member_role, "Member");
        assert_eq!(config.office_hours_role, "Notify: Streams");
        assert_eq!(config.live_stream_role, "Notify: Kent Live");
    }
}
