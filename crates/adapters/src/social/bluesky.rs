//! Bluesky publish adapter (stub)
//!
//! Bluesky support has no real API integration yet: the adapter accepts any
//! post with linked credentials and reports success without a network call.

use async_trait::async_trait;
use devshare_domain::{
    Account, Platform, Post, PublishError, PublishReceipt, SocialPublisher,
};

use super::bearer_token;

pub struct BlueskyPublisher;

impl BlueskyPublisher {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BlueskyPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SocialPublisher for BlueskyPublisher {
    async fn publish(
        &self,
        post: &Post,
        account: &Account,
    ) -> Result<PublishReceipt, PublishError> {
        bearer_token(account, Platform::Bluesky)?;

        tracing::debug!(
            post_id = %post.id,
            "Bluesky publishing is stubbed; reporting success without a network call"
        );

        Ok(PublishReceipt {
            platform: Platform::Bluesky,
            external_id: None,
            url: None,
        })
    }

    fn platform(&self) -> Platform {
        Platform::Bluesky
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devshare_domain::Provider;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_stub_succeeds_with_credentials() {
        let post = Post::new_draft(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Platform::Bluesky,
            "hello sky".to_string(),
            OffsetDateTime::now_utc(),
        );
        let account = Account {
            id: Uuid::new_v4(),
            user_id: post.user_id,
            provider: Provider::Bluesky,
            provider_account_id: "did:plc:abc".to_string(),
            access_token: Some("app-password".to_string()),
            refresh_token: None,
            updated_at: OffsetDateTime::now_utc(),
        };

        let receipt = BlueskyPublisher::new().publish(&post, &account).await.unwrap();
        assert_eq!(receipt.platform, Platform::Bluesky);
        assert!(receipt.external_id.is_none());
    }

    #[tokio::test]
    async fn test_stub_requires_token() {
        let post = Post::new_draft(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Platform::Bluesky,
            "hello sky".to_string(),
            OffsetDateTime::now_utc(),
        );
        let account = Account {
            id: Uuid::new_v4(),
            user_id: post.user_id,
            provider: Provider::Bluesky,
            provider_account_id: "did:plc:abc".to_string(),
            access_token: None,
            refresh_token: None,
            updated_at: OffsetDateTime::now_utc(),
        };

        let result = BlueskyPublisher::new().publish(&post, &account).await;
        assert!(matches!(
            result,
            Err(PublishError::MissingCredentials {
                platform: Platform::Bluesky
            })
        ));
    }
}
