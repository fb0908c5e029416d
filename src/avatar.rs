//! Avatar suggestions from gravatar.
//!
//! Only used to enrich the avatar prompt; a failed lookup just drops the
//! suggested image.

use async_trait::async_trait;

use crate::error::AvatarError;

const GRAVATAR_BASE_URL: &str = "https://www.gravatar.com/avatar";

/// Gravatar hash of an email: md5 of the trimmed, lower-cased address.
pub fn email_hash(email: &str) -> String {
    format!("{:x}", md5::compute(email.trim().to_lowercase().as_bytes()))
}

#[async_trait]
pub trait AvatarLookup: Send + Sync {
    /// Image URL for an email hash, or `None` if no image exists.
    async fn image_url_for(&self, email_hash: &str) -> Result<Option<String>, AvatarError>;
}

pub struct Gravatar {
    base_url: String,
    client: reqwest::Client,
}

impl Gravatar {
    pub fn new() -> Self {
        Self {
            base_url: GRAVATAR_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// 128px image URL; `d=404` makes gravatar answer 404 instead of a default image.
    pub fn image_url(&self, email_hash: &str) -> String {
        format!("{}/{email_hash}?s=128&d=404", self.base_url)
    }
}

impl Default for Gravatar {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AvatarLookup for Gravatar {
    async fn image_url_for(&self, email_hash: &str) -> Result<Option<String>, AvatarError> {
        let url = self.image_url(email_hash);
        let resp = self.client.head(&url).send().await?;
        match resp.status().as_u16() {
            200..=299 => Ok(Some(url)),
            404 => Ok(None),
            status => Err(AvatarError::Status { status }),
        }
    }
}

/// Lookup that never finds an image. Used when running offline.
pub struct NoAvatars;

#[async_trait]
impl AvatarLookup for NoAvatars {
    async fn image_url_for(&self, _email_hash: &str) -> Result<Option<String>, AvatarError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_matches_gravatar_format() {
        assert_eq!(email_hash("fred@example.com"), "6255165076a5e31273cbda50bb9f9636");
        assert_eq!(email_hash("  Fred@Example.com "), "6255165076a5e31273cbda50bb9f9636");
        assert_eq!(email_hash("fred@acme.com"), "53a99aa16438d50f6f7405749684b86e");
    }

    #[test]
    fn image_url_requests_404_default() {
        let url = Gravatar::new().image_url("abc");
        assert_eq!(url, "https://www.gravatar.com/avatar/abc?s=128&d=404");
    }
}
