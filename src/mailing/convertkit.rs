//! ConvertKit v3 client for subscriber lookup and form/tag subscription.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;

use super::{MailingList, Subscriber};
use crate::config::ConvertKitConfig;
use crate::error::MailingListError;

const DEFAULT_BASE_URL: &str = "https://api.convertkit.com/v3";

/// Response of `GET /subscribers`.
#[derive(Debug, Deserialize)]
struct SubscribersResponse {
    #[serde(default)]
    total_subscribers: u64,
    #[serde(default)]
    subscribers: Vec<SubscriberRecord>,
}

#[derive(Debug, Deserialize)]
struct SubscriberRecord {
    email_address: String,
    state: String,
}

pub struct ConvertKitClient {
    config: ConvertKitConfig,
    base_url: String,
    client: reqwest::Client,
}

impl ConvertKitClient {
    pub fn new(config: ConvertKitConfig) -> Self {
        Self {
            config,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the client at a different API root (e.g. a local stub server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn subscribe_body(&self, subscriber: &Subscriber) -> serde_json::Value {
        serde_json::json!({
            "api_key": self.config.api_key.expose_secret(),
            "first_name": subscriber.first_name,
            "email": subscriber.email,
            "fields": subscriber.fields,
        })
    }

    async fn post_subscribe(
        &self,
        path: &str,
        subscriber: &Subscriber,
    ) -> Result<(), MailingListError> {
        let resp = self
            .client
            .post(self.api_url(path))
            .json(&self.subscribe_body(subscriber))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(MailingListError::Status { status, body });
        }
        Ok(())
    }
}

/// Active subscriber with a matching address, ignoring case.
fn contains_active(response: &SubscribersResponse, email: &str) -> bool {
    response.total_subscribers > 0
        && response
            .subscribers
            .iter()
            .any(|s| s.state == "active" && s.email_address.eq_ignore_ascii_case(email))
}

#[async_trait]
impl MailingList for ConvertKitClient {
    async fn is_subscribed(&self, email: &str) -> Result<bool, MailingListError> {
        let resp = self
            .client
            .get(self.api_url("subscribers"))
            .query(&[
                ("api_secret", self.config.api_secret.expose_secret()),
                ("email_address", email),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(MailingListError::Status { status, body });
        }

        let parsed: SubscribersResponse = resp
            .json()
            .await
            .map_err(|e| MailingListError::InvalidResponse(e.to_string()))?;
        Ok(contains_active(&parsed, email))
    }

    async fn subscribe(&self, subscriber: &Subscriber) -> Result<(), MailingListError> {
        let form_path = format!("forms/{}/subscribe", self.config.form_id);
        self.post_subscribe(&form_path, subscriber).await?;

        if let Some(tag_id) = &self.config.tag_id {
            let tag_path = format!("tags/{tag_id}/subscribe");
            if let Err(e) = self.post_subscribe(&tag_path, subscriber).await {
                tracing::warn!(error = %e, tag_id = %tag_id, "Failed to tag mailing list subscriber");
            }
        }

        tracing::info!(form_id = %self.config.form_id, "Subscribed member to mailing list");
        Ok(())
    }
}
