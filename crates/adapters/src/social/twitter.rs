//! X (Twitter) publish adapter

use async_trait::async_trait;
use devshare_domain::{
    Account, Platform, Post, Provider, PublishError, PublishReceipt, SocialPublisher,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::bearer_token;

/// Publishes posts through the X v2 API
pub struct XPublisher {
    client: Client,
    base_url: String,
    max_chars: usize,
}

impl XPublisher {
    pub fn new() -> Self {
        Self::with_base_url("https://api.twitter.com".to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url,
            max_chars: Platform::Twitter.max_chars(),
        }
    }
}

impl Default for XPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct CreateTweetRequest {
    text: String,
}

#[derive(Deserialize)]
struct CreateTweetResponse {
    data: TweetData,
}

#[derive(Deserialize)]
struct TweetData {
    id: String,
}

#[async_trait]
impl SocialPublisher for XPublisher {
    async fn publish(
        &self,
        post: &Post,
        account: &Account,
    ) -> Result<PublishReceipt, PublishError> {
        let token = bearer_token(account, Platform::Twitter)?;

        let len = post.content.chars().count();
        if len > self.max_chars {
            return Err(PublishError::ContentTooLong {
                len,
                max: self.max_chars,
            });
        }

        let request = CreateTweetRequest {
            text: post.content.clone(),
        };

        let url = format!("{}/2/tweets", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        let status = response.status();

        if status == 401 {
            return Err(PublishError::AuthExpired {
                provider: Provider::Twitter,
            });
        }

        if status == 429 {
            return Err(PublishError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let tweet: CreateTweetResponse = response.json().await.map_err(|e| PublishError::Api {
            status: status.as_u16(),
            body: e.to_string(),
        })?;

        Ok(PublishReceipt {
            platform: Platform::Twitter,
            url: Some(format!("https://x.com/i/status/{}", tweet.data.id)),
            external_id: Some(tweet.data.id),
        })
    }

    fn platform(&self) -> Platform {
        Platform::Twitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_post(content: &str) -> Post {
        Post::new_draft(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Platform::Twitter,
            content.to_string(),
            OffsetDateTime::now_utc(),
        )
    }

    fn sample_account() -> Account {
        Account {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            provider: Provider::Twitter,
            provider_account_id: "12345".to_string(),
            access_token: Some("x-token".to_string()),
            refresh_token: None,
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn test_publish_tweet_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .and(header("Authorization", "Bearer x-token"))
            .and(body_json(serde_json::json!({ "text": "TIL about lifetimes" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "data": { "id": "1790000000000000000" }
            })))
            .mount(&mock_server)
            .await;

        let publisher = XPublisher::with_base_url(mock_server.uri());
        let receipt = publisher
            .publish(&sample_post("TIL about lifetimes"), &sample_account())
            .await
            .unwrap();

        assert_eq!(receipt.external_id.as_deref(), Some("1790000000000000000"));
        assert_eq!(
            receipt.url.as_deref(),
            Some("https://x.com/i/status/1790000000000000000")
        );
    }

    #[tokio::test]
    async fn test_content_too_long() {
        let publisher = XPublisher::with_base_url("http://127.0.0.1:1".to_string());
        let long = "x".repeat(281);

        let result = publisher.publish(&sample_post(&long), &sample_account()).await;
        assert!(matches!(
            result,
            Err(PublishError::ContentTooLong { len: 281, max: 280 })
        ));
    }

    #[tokio::test]
    async fn test_unauthorized_is_auth_expired() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let publisher = XPublisher::with_base_url(mock_server.uri());
        let result = publisher
            .publish(&sample_post("text"), &sample_account())
            .await;

        assert!(matches!(
            result,
            Err(PublishError::AuthExpired {
                provider: Provider::Twitter
            })
        ));
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let publisher = XPublisher::with_base_url(mock_server.uri());
        let result = publisher
            .publish(&sample_post("text"), &sample_account())
            .await;

        assert!(matches!(result, Err(PublishError::RateLimited)));
    }
}
