//! HTTP draft gateway adapter

use async_trait::async_trait;
use devshare_domain::{Draft, DraftGenerator, GenerateError, Platform};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::build_prompt;

/// Calls a generative-AI endpoint that turns note content into a
/// platform-tailored draft
pub struct HttpDraftGenerator {
    client: Client,
    endpoint: String,
    api_key: SecretString,
    prompt_template: String,
}

impl HttpDraftGenerator {
    pub fn new(
        endpoint: String,
        api_key: SecretString,
        prompt_template: String,
        timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            endpoint,
            api_key,
            prompt_template,
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    prompt: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    post_content: String,
    #[serde(default)]
    suggested_hashtags: Vec<String>,
    platform: String,
}

#[async_trait]
impl DraftGenerator for HttpDraftGenerator {
    async fn generate(&self, content: &str, platform: Platform) -> Result<Draft, GenerateError> {
        let request = GenerateRequest {
            prompt: build_prompt(&self.prompt_template, content, platform),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerateError::Timeout
                } else {
                    GenerateError::Api(e.to_string())
                }
            })?;

        if response.status() == 429 {
            return Err(GenerateError::RateLimited);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Api(format!(
                "Gateway returned {}: {}",
                status, body
            )));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerateError::InvalidFormat(e.to_string()))?;

        // the gateway echoes the platform back; a mismatch means the prompt
        // substitution went wrong somewhere
        let echoed: Platform = generated
            .platform
            .parse()
            .map_err(GenerateError::InvalidFormat)?;
        if echoed != platform {
            return Err(GenerateError::InvalidFormat(format!(
                "Gateway echoed platform {} for a {} request",
                echoed, platform
            )));
        }

        Ok(Draft {
            content: generated.post_content,
            hashtags: generated.suggested_hashtags,
            platform,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn generator(endpoint: String) -> HttpDraftGenerator {
        HttpDraftGenerator::new(
            endpoint,
            SecretString::new("gw-key".into()),
            "Write for %%platform%%: %%content%%".to_string(),
            5,
        )
    }

    #[tokio::test]
    async fn test_generate_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/generate"))
            .and(header("Authorization", "Bearer gw-key"))
            .and(body_string_contains("Write for linkedin: rust notes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "post_content": "Today I learned some Rust.",
                "suggested_hashtags": ["#rust", "#learning"],
                "platform": "linkedin"
            })))
            .mount(&mock_server)
            .await;

        let generator = generator(format!("{}/generate", mock_server.uri()));
        let draft = generator
            .generate("rust notes", Platform::Linkedin)
            .await
            .unwrap();

        assert_eq!(draft.content, "Today I learned some Rust.");
        assert_eq!(draft.hashtags, vec!["#rust", "#learning"]);
        assert_eq!(draft.platform, Platform::Linkedin);
    }

    #[tokio::test]
    async fn test_generate_hashtags_optional() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "post_content": "A tweet.",
                "platform": "twitter"
            })))
            .mount(&mock_server)
            .await;

        let generator = generator(format!("{}/generate", mock_server.uri()));
        let draft = generator.generate("notes", Platform::Twitter).await.unwrap();

        assert!(draft.hashtags.is_empty());
    }

    #[tokio::test]
    async fn test_generate_invalid_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let generator = generator(format!("{}/generate", mock_server.uri()));
        let result = generator.generate("notes", Platform::Twitter).await;

        assert!(matches!(result, Err(GenerateError::InvalidFormat(_))));
    }

    #[tokio::test]
    async fn test_generate_platform_mismatch() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "post_content": "A post.",
                "platform": "bluesky"
            })))
            .mount(&mock_server)
            .await;

        let generator = generator(format!("{}/generate", mock_server.uri()));
        let result = generator.generate("notes", Platform::Twitter).await;

        assert!(matches!(result, Err(GenerateError::InvalidFormat(_))));
    }

    #[tokio::test]
    async fn test_generate_rate_limited() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let generator = generator(format!("{}/generate", mock_server.uri()));
        let result = generator.generate("notes", Platform::Twitter).await;

        assert!(matches!(result, Err(GenerateError::RateLimited)));
    }
}
