//! Draft generation use case - one gateway call per requested platform

use futures::future::join_all;
use std::sync::Arc;

use crate::{
    model::{Draft, Platform},
    ports::{DraftGenerator, GenerateError},
};

/// Fans note content out to the generation gateway, one call per platform,
/// in parallel. The gateway layer performs no retries; a platform's failure
/// is reported alongside the others' successes.
pub struct GenerateDrafts<G>
where
    G: DraftGenerator + ?Sized,
{
    generator: Arc<G>,
}

impl<G> GenerateDrafts<G>
where
    G: DraftGenerator + ?Sized,
{
    pub fn new(generator: Arc<G>) -> Self {
        Self { generator }
    }

    pub async fn generate_all(
        &self,
        content: &str,
        platforms: &[Platform],
    ) -> Vec<(Platform, Result<Draft, GenerateError>)> {
        let futures = platforms.iter().map(|&platform| {
            let generator = Arc::clone(&self.generator);
            async move {
                let result = generator.generate(content, platform).await;
                if let Err(error) = &result {
                    tracing::warn!(platform = %platform, error = %error, "Draft generation failed");
                }
                (platform, result)
            }
        });
        join_all(futures).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FakeGenerator {
        fail_platform: Option<Platform>,
    }

    #[async_trait]
    impl DraftGenerator for FakeGenerator {
        async fn generate(
            &self,
            content: &str,
            platform: Platform,
        ) -> Result<Draft, GenerateError> {
            if self.fail_platform == Some(platform) {
                return Err(GenerateError::Api("boom".to_string()));
            }
            Ok(Draft {
                content: format!("{} for {}", content, platform),
                hashtags: vec!["#dev".to_string()],
                platform,
            })
        }
    }

    #[tokio::test]
    async fn test_generates_per_platform() {
        let usecase = GenerateDrafts::new(Arc::new(FakeGenerator {
            fail_platform: None,
        }));

        let results = usecase
            .generate_all("note", &[Platform::Linkedin, Platform::Twitter])
            .await;

        assert_eq!(results.len(), 2);
        let (platform, draft) = &results[0];
        assert_eq!(*platform, Platform::Linkedin);
        assert_eq!(draft.as_ref().unwrap().content, "note for linkedin");
    }

    #[tokio::test]
    async fn test_one_failure_does_not_mask_others() {
        let usecase = GenerateDrafts::new(Arc::new(FakeGenerator {
            fail_platform: Some(Platform::Twitter),
        }));

        let results = usecase
            .generate_all("note", &[Platform::Twitter, Platform::Bluesky])
            .await;

        assert!(results[0].1.is_err());
        assert!(results[1].1.is_ok());
    }
}
