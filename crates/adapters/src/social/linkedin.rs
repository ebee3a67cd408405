//! LinkedIn UGC post adapter

use async_trait::async_trait;
use devshare_domain::{
    Account, Platform, Post, Provider, PublishError, PublishReceipt, SocialPublisher,
    validate_content,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::bearer_token;

/// Publishes posts as LinkedIn UGC shares
pub struct LinkedInPublisher {
    client: Client,
    base_url: String,
}

impl LinkedInPublisher {
    pub fn new() -> Self {
        Self::with_base_url("https://api.linkedin.com".to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self { client, base_url }
    }
}

impl Default for LinkedInPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct UgcPostRequest {
    author: String,
    #[serde(rename = "lifecycleState")]
    lifecycle_state: &'static str,
    #[serde(rename = "specificContent")]
    specific_content: SpecificContent,
    visibility: Visibility,
}

#[derive(Serialize)]
struct SpecificContent {
    #[serde(rename = "com.linkedin.ugc.ShareContent")]
    share_content: ShareContent,
}

#[derive(Serialize)]
struct ShareContent {
    #[serde(rename = "shareCommentary")]
    share_commentary: TextBlock,
    #[serde(rename = "shareMediaCategory")]
    share_media_category: &'static str,
}

#[derive(Serialize)]
struct TextBlock {
    text: String,
}

#[derive(Serialize)]
struct Visibility {
    #[serde(rename = "com.linkedin.ugc.MemberNetworkVisibility")]
    member_network_visibility: &'static str,
}

#[derive(Deserialize, Default)]
struct UgcPostResponse {
    #[serde(default)]
    id: Option<String>,
}

#[async_trait]
impl SocialPublisher for LinkedInPublisher {
    async fn publish(
        &self,
        post: &Post,
        account: &Account,
    ) -> Result<PublishReceipt, PublishError> {
        let token = bearer_token(account, Platform::Linkedin)?;

        validate_content(Platform::Linkedin, &post.content).map_err(|_| {
            PublishError::ContentTooLong {
                len: post.content.chars().count(),
                max: Platform::Linkedin.max_chars(),
            }
        })?;

        let request = UgcPostRequest {
            author: format!("urn:li:person:{}", account.provider_account_id),
            lifecycle_state: "PUBLISHED",
            specific_content: SpecificContent {
                share_content: ShareContent {
                    share_commentary: TextBlock {
                        text: post.content.clone(),
                    },
                    share_media_category: "NONE",
                },
            },
            visibility: Visibility {
                member_network_visibility: "PUBLIC",
            },
        };

        let url = format!("{}/v2/ugcPosts", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("X-Restli-Protocol-Version", "2.0.0")
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        let status = response.status();

        if status == 401 {
            return Err(PublishError::AuthExpired {
                provider: Provider::Linkedin,
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

        // the share URN arrives in the x-restli-id header; newer responses
        // also echo it in the body
        let header_id = response
            .headers()
            .get("x-restli-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body: UgcPostResponse = response.json().await.unwrap_or_default();
        let external_id = header_id.or(body.id);
        let url = external_id
            .as_deref()
            .map(|id| format!("https://www.linkedin.com/feed/update/{}", id));

        Ok(PublishReceipt {
            platform: Platform::Linkedin,
            external_id,
            url,
        })
    }

    fn platform(&self) -> Platform {
        Platform::Linkedin
    }
}
