use std::sync::Arc;

use anyhow::Context;
use community_onboarding::avatar::{AvatarLookup, Gravatar, NoAvatars};
use community_onboarding::config::{ConvertKitConfig, OnboardingConfig};
use community_onboarding::error::ConfigError;
use community_onboarding::mailing::{ConvertKitClient, MailingList, MemoryMailingList};
use community_onboarding::onboarding::OnboardingManager;
use community_onboarding::platform::{CliSession, InMemoryPlatform, Member};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = OnboardingConfig::from_env();

    eprintln!("👋 Community onboarding v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Community: {}", config.community_name);

    // ── Collaborators ───────────────────────────────────────────────────
    let mailing_list: Arc<dyn MailingList> = match ConvertKitConfig::from_env() {
        Ok(convertkit) => {
            eprintln!("   Mailing list: ConvertKit form {}", convertkit.form_id);
            Arc::new(ConvertKitClient::new(convertkit))
        }
        Err(ConfigError::MissingEnvVar(key)) => {
            eprintln!("   Mailing list: in-memory ({key} not set)");
            Arc::new(MemoryMailingList::new())
        }
        Err(e) => return Err(e).context("invalid ConvertKit configuration"),
    };

    let avatars: Arc<dyn AvatarLookup> = if std::env::var("ONBOARDING_OFFLINE").is_ok() {
        eprintln!("   Avatars: disabled (offline)");
        Arc::new(NoAvatars)
    } else {
        eprintln!("   Avatars: gravatar.com");
        Arc::new(Gravatar::new())
    };

    // ── Demo server ─────────────────────────────────────────────────────
    let platform = Arc::new(InMemoryPlatform::new("BOT"));
    for role in [
        &config.member_role,
        &config.unconfirmed_role,
        &config.live_stream_role,
        &config.office_hours_role,
    ] {
        platform.define_role(role).await;
    }
    for channel in [
        &config.category_name,
        &config.introductions_channel,
        &config.live_stream_channel,
        &config.office_hours_channel,
    ] {
        platform.add_channel(channel).await;
    }

    let username =
        std::env::var("ONBOARDING_DEMO_USER").unwrap_or_else(|_| "fredjoe".to_string());
    let member = Member {
        id: uuid::Uuid::new_v4().simple().to_string(),
        display_name: username.clone(),
        username,
        discriminator: "1234".to_string(),
        nickname: None,
        has_avatar: false,
        roles: Vec::new(),
    };
    platform.add_member(member.clone()).await;

    let manager = Arc::new(OnboardingManager::new(
        platform.clone(),
        mailing_list,
        avatars,
        config,
    ));

    eprintln!("   Answer as {}. /edit N text edits your Nth message, /transcript shows the channel, /quit exits.\n", member.tag());

    CliSession::new(platform.clone(), manager, member.clone())
        .run()
        .await?;

    let roles = platform.role_names(&member.id).await;
    eprintln!("Roles: {}", roles.join(", "));
    Ok(())
}
