//! Error types for the onboarding bot.
//!
//! Answer validation failures are not errors: they are surfaced to the member
//! as chat replies (see `onboarding::questions::ValidationError`).

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Mailing list error: {0}")]
    MailingList(#[from] MailingListError),

    #[error("Avatar lookup error: {0}")]
    Avatar(#[from] AvatarError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Chat-platform errors (channels, messages, roles, members).
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("Channel {id} not found")]
    ChannelNotFound { id: String },

    #[error("Message {id} not found in channel {channel}")]
    MessageNotFound { channel: String, id: String },

    #[error("Member {id} not found")]
    MemberNotFound { id: String },

    #[error("Role {name} not found")]
    RoleNotFound { name: String },

    #[error("Refusing to send a message with no content")]
    EmptyMessage,

    #[error("Platform request {action} failed: {reason}")]
    RequestFailed { action: String, reason: String },
}

/// Mailing-list API errors.
#[derive(Debug, thiserror::Error)]
pub enum MailingListError {
    #[error("Mailing list request failed: {0}")]
    Request(String),

    #[error("Mailing list returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response from mailing list: {0}")]
    InvalidResponse(String),
}

impl MailingListError {
    /// Whether a later attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidResponse(_) => false,
        }
    }
}

impl From<reqwest::Error> for MailingListError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e.to_string())
    }
}

/// Avatar lookup errors.
#[derive(Debug, thiserror::Error)]
pub enum AvatarError {
    #[error("Avatar request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Avatar service returned {status}")]
    Status { status: u16 },
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
