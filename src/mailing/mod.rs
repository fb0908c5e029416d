//! Mailing-list collaborator.
//!
//! Failures are never fatal to a conversation: the onboarding manager treats
//! any error from [`MailingList::is_subscribed`] as "not subscribed yet".

pub mod convertkit;

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::MailingListError;

pub use convertkit::ConvertKitClient;

/// A subscription request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    pub first_name: String,
    pub email: String,
    /// Custom fields stored with the subscriber (e.g. `discord_user_id`).
    pub fields: BTreeMap<String, String>,
}

#[async_trait]
pub trait MailingList: Send + Sync {
    /// Whether `email` is already an active subscriber.
    async fn is_subscribed(&self, email: &str) -> Result<bool, MailingListError>;

    /// Subscribe (or update) a subscriber.
    async fn subscribe(&self, subscriber: &Subscriber) -> Result<(), MailingListError>;
}

/// Mailing list that keeps everything in memory. Addresses are compared
/// case-insensitively.
#[derive(Default)]
pub struct MemoryMailingList {
    existing: RwLock<Vec<String>>,
    subscribed: RwLock<Vec<Subscriber>>,
    unavailable: RwLock<bool>,
}

impl MemoryMailingList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an address as already subscribed before the conversation starts.
    pub async fn add_existing(&self, email: &str) {
        self.existing.write().await.push(email.to_lowercase());
    }

    /// Make every call fail with a transient error.
    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }

    /// Subscription requests received so far.
    pub async fn subscriptions(&self) -> Vec<Subscriber> {
        self.subscribed.read().await.clone()
    }

    async fn check_available(&self) -> Result<(), MailingListError> {
        if *self.unavailable.read().await {
            return Err(MailingListError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MailingList for MemoryMailingList {
    async fn is_subscribed(&self, email: &str) -> Result<bool, MailingListError> {
        self.check_available().await?;
        let email = email.to_lowercase();
        Ok(self.existing.read().await.contains(&email))
    }

    async fn subscribe(&self, subscriber: &Subscriber) -> Result<(), MailingListError> {
        self.check_available().await?;
        self.subscribed.write().await.push(subscriber.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn existing_addresses_match_case_insensitively() {
        let list = MemoryMailingList::new();
        list.add_existing("Fred@Example.com").await;
        assert!(list.is_subscribed("fred@example.com").await.unwrap());
        assert!(!list.is_subscribed("other@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn unavailable_list_fails_transiently() {
        let list = MemoryMailingList::new();
        list.set_unavailable(true).await;
        let err = list.is_subscribed("fred@example.com").await.unwrap_err();
        assert!(err.is_transient());
    }
}
