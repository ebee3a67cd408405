//! Publish orchestrator - resolves the target platform and converges a
//! post's status to a consistent terminal value
//!
//! The orchestrator owns the only status write path. A publish attempt first
//! claims the post with an atomic compare-and-set (draft|scheduled ->
//! publishing), so two instances scanning the same due post cannot both
//! deliver it. The post stays in `publishing` across retry attempts; `draft`
//! is written exactly once, on terminal failure.

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::{
    model::{Platform, PublishReceipt},
    ports::{Clock, PostStore, PublishError, SocialPublisher, StoreError},
};

/// Retry policy for publish attempts
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// Additional attempts after the first failure
    pub max_retries: u32,
    /// Fixed delay between attempts (no backoff)
    pub retry_delay: Duration,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// Errors from a publish operation
#[derive(Debug, thiserror::Error)]
pub enum PublishPostError {
    #[error("Post not found: {0}")]
    NotFound(Uuid),
    #[error("No publisher registered for platform {0}")]
    UnsupportedPlatform(Platform),
    #[error("Post {0} is not claimable (already published or in flight)")]
    NotClaimable(Uuid),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Publish orchestrator
#[derive(Clone)]
pub struct PublishOrchestrator<St, Cl>
where
    St: PostStore + ?Sized,
    Cl: Clock + ?Sized,
{
    store: Arc<St>,
    clock: Arc<Cl>,
    publishers: Vec<Arc<dyn SocialPublisher>>,
    config: PublishConfig,
}

impl<St, Cl> PublishOrchestrator<St, Cl>
where
    St: PostStore + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(
        store: Arc<St>,
        clock: Arc<Cl>,
        publishers: Vec<Arc<dyn SocialPublisher>>,
        config: PublishConfig,
    ) -> Self {
        Self {
            store,
            clock,
            publishers,
            config,
        }
    }

    fn publisher_for(&self, platform: Platform) -> Option<&Arc<dyn SocialPublisher>> {
        self.publishers.iter().find(|p| p.platform() == platform)
    }

    /// Attempt delivery of a post, retrying transient failures.
    ///
    /// Platform and credential resolution happen before the claim, so
    /// `UnsupportedPlatform` and `MissingCredentials` never mutate status.
    pub async fn publish(&self, post_id: Uuid) -> Result<PublishReceipt, PublishPostError> {
        let ctx = self
            .store
            .publish_context(post_id)
            .await?
            .ok_or(PublishPostError::NotFound(post_id))?;

        let platform = ctx.post.platform;
        let publisher = self
            .publisher_for(platform)
            .ok_or(PublishPostError::UnsupportedPlatform(platform))?;

        let account = ctx
            .account_for(platform.provider())
            .filter(|a| a.access_token.is_some())
            .ok_or(PublishError::MissingCredentials { platform })?
            .clone();

        if !self.store.claim_for_publish(post_id).await? {
            return Err(PublishPostError::NotClaimable(post_id));
        }

        let max_attempts = self.config.max_retries + 1;
        let mut attempt = 1u32;
        loop {
            match publisher.publish(&ctx.post, &account).await {
                Ok(receipt) => {
                    let now = self.clock.now();
                    self.store.mark_published(post_id, now, &receipt).await?;
                    tracing::info!(
                        post_id = %post_id,
                        platform = %platform,
                        external_id = ?receipt.external_id,
                        attempt,
                        "Published post"
                    );
                    return Ok(receipt);
                }
                Err(error) if error.is_retryable() && attempt < max_attempts => {
                    tracing::warn!(
                        post_id = %post_id,
                        platform = %platform,
                        attempt,
                        error = %error,
                        "Publish attempt failed, retrying"
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    tracing::error!(
                        post_id = %post_id,
                        platform = %platform,
                        attempt,
                        error = %error,
                        "Publish failed, rolling post back to draft"
                    );
                    self.store.rollback_to_draft(post_id).await?;
                    return Err(error.into());
                }
            }
        }
    }

    /// Manual override: mark a post published without calling any platform
    pub async fn mark_published(&self, post_id: Uuid) -> Result<(), PublishPostError> {
        let ctx = self
            .store
            .publish_context(post_id)
            .await?
            .ok_or(PublishPostError::NotFound(post_id))?;

        let receipt = PublishReceipt {
            platform: ctx.post.platform,
            external_id: None,
            url: None,
        };
        self.store
            .mark_published(post_id, self.clock.now(), &receipt)
            .await?;
        tracing::info!(post_id = %post_id, "Marked post as published (manual override)");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{Account, Platform, Post, PostStatus, Provider, User};
    use crate::ports::{PublishContext, SystemClock};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use time::OffsetDateTime;

    /// In-memory store fake shared by the orchestrator and scheduler tests
    pub(crate) struct FakeStore {
        pub posts: Mutex<HashMap<Uuid, Post>>,
        pub user: User,
        pub accounts: Vec<Account>,
    }

    impl FakeStore {
        pub fn new(user: User, accounts: Vec<Account>) -> Self {
            Self {
                posts: Mutex::new(HashMap::new()),
                user,
                accounts,
            }
        }

        pub fn insert_post(&self, post: Post) {
            self.posts.lock().unwrap().insert(post.id, post);
        }

        pub fn status_of(&self, id: Uuid) -> PostStatus {
            self.posts.lock().unwrap().get(&id).unwrap().status
        }
    }

    #[async_trait]
    impl PostStore for FakeStore {
        async fn upsert_user(
            &self,
            _email: &str,
            _display_name: Option<&str>,
        ) -> Result<User, StoreError> {
            Ok(self.user.clone())
        }

        async fn upsert_account(&self, _account: &Account) -> Result<(), StoreError> {
            Ok(())
        }

        async fn accounts_for_user(&self, _user_id: Uuid) -> Result<Vec<Account>, StoreError> {
            Ok(self.accounts.clone())
        }

        async fn create_note(&self, _note: &crate::model::Note) -> Result<(), StoreError> {
            Ok(())
        }

        async fn get_note(&self, _id: Uuid) -> Result<Option<crate::model::Note>, StoreError> {
            Ok(None)
        }

        async fn list_notes(&self, _user_id: Uuid) -> Result<Vec<crate::model::Note>, StoreError> {
            Ok(vec![])
        }

        async fn delete_note(&self, _id: Uuid) -> Result<(), StoreError> {
            Ok(())
        }

        async fn count_posts_for_note(&self, _note_id: Uuid) -> Result<u64, StoreError> {
            Ok(0)
        }

        async fn create_post(&self, post: &Post) -> Result<(), StoreError> {
            self.insert_post(post.clone());
            Ok(())
        }

        async fn get_post(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
            Ok(self.posts.lock().unwrap().get(&id).cloned())
        }

        async fn list_posts(&self, _user_id: Uuid) -> Result<Vec<Post>, StoreError> {
            Ok(self.posts.lock().unwrap().values().cloned().collect())
        }

        async fn publish_context(
            &self,
            post_id: Uuid,
        ) -> Result<Option<PublishContext>, StoreError> {
            let post = self.posts.lock().unwrap().get(&post_id).cloned();
            Ok(post.filter(|p| !p.is_deleted).map(|post| PublishContext {
                post,
                user: self.user.clone(),
                accounts: self.accounts.clone(),
            }))
        }

        async fn due_posts(&self, now: OffsetDateTime) -> Result<Vec<Post>, StoreError> {
            let mut due: Vec<Post> = self
                .posts
                .lock()
                .unwrap()
                .values()
                .filter(|p| {
                    p.status == PostStatus::Scheduled
                        && !p.is_deleted
                        && p.scheduled_for.is_some_and(|at| at <= now)
                })
                .cloned()
                .collect();
            due.sort_by_key(|p| p.scheduled_for);
            Ok(due)
        }

        async fn claim_for_publish(&self, id: Uuid) -> Result<bool, StoreError> {
            let mut posts = self.posts.lock().unwrap();
            match posts.get_mut(&id) {
                Some(post)
                    if !post.is_deleted
                        && matches!(post.status, PostStatus::Draft | PostStatus::Scheduled) =>
                {
                    post.status = PostStatus::Publishing;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn mark_published(
            &self,
            id: Uuid,
            at: OffsetDateTime,
            receipt: &PublishReceipt,
        ) -> Result<(), StoreError> {
            let mut posts = self.posts.lock().unwrap();
            let post = posts
                .get_mut(&id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            post.status = PostStatus::Published;
            post.published_at = Some(at);
            post.external_id = receipt.external_id.clone();
            post.external_url = receipt.url.clone();
            Ok(())
        }

        async fn rollback_to_draft(&self, id: Uuid) -> Result<(), StoreError> {
            let mut posts = self.posts.lock().unwrap();
            let post = posts
                .get_mut(&id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            post.status = PostStatus::Draft;
            Ok(())
        }

        async fn schedule_post(&self, id: Uuid, at: OffsetDateTime) -> Result<(), StoreError> {
            let mut posts = self.posts.lock().unwrap();
            let post = posts
                .get_mut(&id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            post.status = PostStatus::Scheduled;
            post.scheduled_for = Some(at);
            Ok(())
        }
    }

    /// Publisher fake that fails the first `fail_first` attempts and records
    /// the paused-clock instant of each call
    pub(crate) struct FlakyPublisher {
        platform: Platform,
        fail_first: u32,
        pub calls: Mutex<Vec<tokio::time::Instant>>,
        error: fn() -> PublishError,
    }

    impl FlakyPublisher {
        pub fn new(platform: Platform, fail_first: u32) -> Self {
            Self {
                platform,
                fail_first,
                calls: Mutex::new(Vec::new()),
                error: || PublishError::Api {
                    status: 500,
                    body: "upstream error".to_string(),
                },
            }
        }

        pub fn with_error(platform: Platform, error: fn() -> PublishError) -> Self {
            Self {
                platform,
                fail_first: u32::MAX,
                calls: Mutex::new(Vec::new()),
                error,
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SocialPublisher for FlakyPublisher {
        async fn publish(
            &self,
            post: &Post,
            _account: &Account,
        ) -> Result<PublishReceipt, PublishError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(tokio::time::Instant::now());
            let attempt = calls.len() as u32;
            drop(calls);

            if attempt <= self.fail_first {
                return Err((self.error)());
            }
            Ok(PublishReceipt {
                platform: post.platform,
                external_id: Some(format!("ext-{}", attempt)),
                url: None,
            })
        }

        fn platform(&self) -> Platform {
            self.platform
        }
    }

    pub(crate) fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "dev@example.com".to_string(),
            display_name: Some("Dev".to_string()),
            password_hash: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub(crate) fn linked_account(user_id: Uuid, provider: Provider) -> Account {
        Account {
            id: Uuid::new_v4(),
            user_id,
            provider,
            provider_account_id: format!("{}-acct", provider),
            access_token: Some("token".to_string()),
            refresh_token: None,
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    pub(crate) fn draft_post(user_id: Uuid, platform: Platform) -> Post {
        Post::new_draft(
            Uuid::new_v4(),
            user_id,
            platform,
            "test content".to_string(),
            OffsetDateTime::now_utc(),
        )
    }

    fn orchestrator(
        store: Arc<FakeStore>,
        publishers: Vec<Arc<dyn SocialPublisher>>,
    ) -> PublishOrchestrator<FakeStore, SystemClock> {
        PublishOrchestrator::new(
            store,
            Arc::new(SystemClock),
            publishers,
            PublishConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_succeeds_first_try() {
        let user = test_user();
        let account = linked_account(user.id, Provider::Linkedin);
        let store = Arc::new(FakeStore::new(user.clone(), vec![account]));
        let post = draft_post(user.id, Platform::Linkedin);
        let post_id = post.id;
        store.insert_post(post);

        let publisher = Arc::new(FlakyPublisher::new(Platform::Linkedin, 0));
        let orch = orchestrator(Arc::clone(&store), vec![publisher.clone()]);

        let receipt = orch.publish(post_id).await.unwrap();
        assert_eq!(receipt.platform, Platform::Linkedin);
        assert_eq!(publisher.call_count(), 1);
        assert_eq!(store.status_of(post_id), PostStatus::Published);

        let stored = store.get_post(post_id).await.unwrap().unwrap();
        assert!(stored.published_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_succeeds_second_try() {
        let user = test_user();
        let account = linked_account(user.id, Provider::Twitter);
        let store = Arc::new(FakeStore::new(user.clone(), vec![account]));
        let post = draft_post(user.id, Platform::Twitter);
        let post_id = post.id;
        store.insert_post(post);

        let publisher = Arc::new(FlakyPublisher::new(Platform::Twitter, 1));
        let orch = orchestrator(Arc::clone(&store), vec![publisher.clone()]);

        let receipt = orch.publish(post_id).await.unwrap();
        assert_eq!(publisher.call_count(), 2);
        assert_eq!(store.status_of(post_id), PostStatus::Published);
        assert!(receipt.external_id.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_exhausts_retries_and_rolls_back() {
        let user = test_user();
        let account = linked_account(user.id, Provider::Linkedin);
        let store = Arc::new(FakeStore::new(user.clone(), vec![account]));
        let post = draft_post(user.id, Platform::Linkedin);
        let post_id = post.id;
        store.insert_post(post);

        let publisher = Arc::new(FlakyPublisher::new(Platform::Linkedin, u32::MAX));
        let orch = orchestrator(Arc::clone(&store), vec![publisher.clone()]);

        let result = orch.publish(post_id).await;
        assert!(matches!(
            result,
            Err(PublishPostError::Publish(PublishError::Api { status: 500, .. }))
        ));
        // initial attempt + 2 retries
        assert_eq!(publisher.call_count(), 3);
        assert_eq!(store.status_of(post_id), PostStatus::Draft);

        // fixed delay between attempts
        let calls = publisher.calls.lock().unwrap();
        for pair in calls.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(5));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_expired_not_retried() {
        let user = test_user();
        let account = linked_account(user.id, Provider::Linkedin);
        let store = Arc::new(FakeStore::new(user.clone(), vec![account]));
        let post = draft_post(user.id, Platform::Linkedin);
        let post_id = post.id;
        store.insert_post(post);

        let publisher = Arc::new(FlakyPublisher::with_error(Platform::Linkedin, || {
            PublishError::AuthExpired {
                provider: Provider::Linkedin,
            }
        }));
        let orch = orchestrator(Arc::clone(&store), vec![publisher.clone()]);

        let result = orch.publish(post_id).await;
        assert!(matches!(
            result,
            Err(PublishPostError::Publish(PublishError::AuthExpired {
                provider: Provider::Linkedin
            }))
        ));
        assert_eq!(publisher.call_count(), 1);
        assert_eq!(store.status_of(post_id), PostStatus::Draft);
    }

    #[tokio::test]
    async fn test_unsupported_platform_leaves_status_unchanged() {
        let user = test_user();
        let account = linked_account(user.id, Provider::Bluesky);
        let store = Arc::new(FakeStore::new(user.clone(), vec![account]));
        let post = draft_post(user.id, Platform::Bluesky);
        let post_id = post.id;
        store.insert_post(post);

        // no bluesky publisher registered
        let orch = orchestrator(Arc::clone(&store), vec![]);

        let result = orch.publish(post_id).await;
        assert!(matches!(
            result,
            Err(PublishPostError::UnsupportedPlatform(Platform::Bluesky))
        ));
        assert_eq!(store.status_of(post_id), PostStatus::Draft);
    }

    #[tokio::test]
    async fn test_missing_credentials_leaves_status_unchanged() {
        let user = test_user();
        // linked account exists but for a different provider
        let account = linked_account(user.id, Provider::Twitter);
        let store = Arc::new(FakeStore::new(user.clone(), vec![account]));
        let post = draft_post(user.id, Platform::Linkedin);
        let post_id = post.id;
        store.insert_post(post);

        let publisher = Arc::new(FlakyPublisher::new(Platform::Linkedin, 0));
        let orch = orchestrator(Arc::clone(&store), vec![publisher.clone()]);

        let result = orch.publish(post_id).await;
        assert!(matches!(
            result,
            Err(PublishPostError::Publish(PublishError::MissingCredentials {
                platform: Platform::Linkedin
            }))
        ));
        assert_eq!(publisher.call_count(), 0);
        assert_eq!(store.status_of(post_id), PostStatus::Draft);
    }

    #[tokio::test]
    async fn test_publish_missing_post_is_not_found() {
        let user = test_user();
        let store = Arc::new(FakeStore::new(user, vec![]));
        let orch = orchestrator(store, vec![]);

        let id = Uuid::new_v4();
        let result = orch.publish(id).await;
        assert!(matches!(result, Err(PublishPostError::NotFound(found)) if found == id));
    }

    #[tokio::test]
    async fn test_published_post_is_not_claimable() {
        let user = test_user();
        let account = linked_account(user.id, Provider::Twitter);
        let store = Arc::new(FakeStore::new(user.clone(), vec![account]));
        let mut post = draft_post(user.id, Platform::Twitter);
        post.status = PostStatus::Published;
        post.published_at = Some(OffsetDateTime::now_utc());
        let post_id = post.id;
        store.insert_post(post);

        let publisher = Arc::new(FlakyPublisher::new(Platform::Twitter, 0));
        let orch = orchestrator(Arc::clone(&store), vec![publisher.clone()]);

        let result = orch.publish(post_id).await;
        assert!(matches!(result, Err(PublishPostError::NotClaimable(_))));
        assert_eq!(publisher.call_count(), 0);
        assert_eq!(store.status_of(post_id), PostStatus::Published);
    }

    #[tokio::test]
    async fn test_mark_published_manual_override() {
        let user = test_user();
        let store = Arc::new(FakeStore::new(user.clone(), vec![]));
        let post = draft_post(user.id, Platform::Bluesky);
        let post_id = post.id;
        store.insert_post(post);

        let orch = orchestrator(Arc::clone(&store), vec![]);
        orch.mark_published(post_id).await.unwrap();

        let stored = store.get_post(post_id).await.unwrap().unwrap();
        assert_eq!(stored.status, PostStatus::Published);
        assert!(stored.published_at.is_some());
        assert!(stored.external_id.is_none());
    }
}
