//! Deterministic draft generator for tests and offline use

use async_trait::async_trait;
use devshare_domain::{Draft, DraftGenerator, GenerateError, Platform};

/// Produces a trivial platform-trimmed draft without calling any service
pub struct StubDraftGenerator;

impl StubDraftGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StubDraftGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DraftGenerator for StubDraftGenerator {
    async fn generate(&self, content: &str, platform: Platform) -> Result<Draft, GenerateError> {
        // leave room for the hashtag line the caller may append
        let budget = platform.max_chars().saturating_sub(20);
        let content: String = content.chars().take(budget).collect();

        Ok(Draft {
            content,
            hashtags: vec!["#DevShare".to_string()],
            platform,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_truncates_to_platform_budget() {
        let generator = StubDraftGenerator::new();
        let long = "a".repeat(1000);

        let draft = generator.generate(&long, Platform::Twitter).await.unwrap();
        assert!(draft.content.chars().count() <= Platform::Twitter.max_chars());

        let draft = generator.generate(&long, Platform::Linkedin).await.unwrap();
        assert_eq!(draft.content.chars().count(), 1000);
    }
}
