//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::model::{
    Account, Draft, Note, Platform, Post, Provider, PublishReceipt, User,
};

/// Error type for store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A post together with its owning user and the user's linked accounts,
/// loaded in one shot for a publish attempt
#[derive(Debug, Clone)]
pub struct PublishContext {
    pub post: Post,
    pub user: User,
    pub accounts: Vec<Account>,
}

impl PublishContext {
    /// Find the linked account for a provider
    pub fn account_for(&self, provider: Provider) -> Option<&Account> {
        self.accounts.iter().find(|a| a.provider == provider)
    }
}

/// Port for persisting users, accounts, notes, and posts
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Upsert a user by email, returning the stored row
    async fn upsert_user(&self, email: &str, display_name: Option<&str>)
        -> Result<User, StoreError>;

    /// Upsert a linked account, keyed by (user, provider)
    async fn upsert_account(&self, account: &Account) -> Result<(), StoreError>;

    /// List linked accounts for a user
    async fn accounts_for_user(&self, user_id: Uuid) -> Result<Vec<Account>, StoreError>;

    /// Insert a new note
    async fn create_note(&self, note: &Note) -> Result<(), StoreError>;

    /// Fetch a note by id (excludes soft-deleted)
    async fn get_note(&self, id: Uuid) -> Result<Option<Note>, StoreError>;

    /// List non-deleted notes for a user, newest first
    async fn list_notes(&self, user_id: Uuid) -> Result<Vec<Note>, StoreError>;

    /// Soft-delete a note
    async fn delete_note(&self, id: Uuid) -> Result<(), StoreError>;

    /// Count non-deleted posts attached to a note
    async fn count_posts_for_note(&self, note_id: Uuid) -> Result<u64, StoreError>;

    /// Insert a new post
    async fn create_post(&self, post: &Post) -> Result<(), StoreError>;

    /// Fetch a post by id (excludes soft-deleted)
    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, StoreError>;

    /// List non-deleted posts for a user, newest first
    async fn list_posts(&self, user_id: Uuid) -> Result<Vec<Post>, StoreError>;

    /// Load a post with its owning user and linked accounts
    async fn publish_context(&self, post_id: Uuid) -> Result<Option<PublishContext>, StoreError>;

    /// Posts due for publishing: scheduled, scheduled_for <= now, not
    /// deleted, ordered by scheduled_for
    async fn due_posts(&self, now: OffsetDateTime) -> Result<Vec<Post>, StoreError>;

    /// Atomically claim a post for publishing (draft|scheduled -> publishing).
    /// Returns false if the post was not claimable, e.g. already published or
    /// claimed by another instance.
    async fn claim_for_publish(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Mark a post published, recording the receipt
    async fn mark_published(
        &self,
        id: Uuid,
        at: OffsetDateTime,
        receipt: &PublishReceipt,
    ) -> Result<(), StoreError>;

    /// Roll a post back to draft after a terminal publish failure
    async fn rollback_to_draft(&self, id: Uuid) -> Result<(), StoreError>;

    /// Move a post to scheduled with the given timestamp
    async fn schedule_post(&self, id: Uuid, at: OffsetDateTime) -> Result<(), StoreError>;
}

/// Port for short-lived OAuth/PKCE state, keyed by the `state` parameter.
///
/// Backed by the shared store so any instance can complete a callback.
#[async_trait]
pub trait PkceStore: Send + Sync {
    /// Record a pending authorization: state -> code verifier, with expiry
    async fn put_state(
        &self,
        state: &str,
        verifier: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError>;

    /// Consume a pending authorization. Returns the verifier if the state
    /// exists and has not expired; the entry is removed either way.
    async fn take_state(
        &self,
        state: &str,
        now: OffsetDateTime,
    ) -> Result<Option<String>, StoreError>;
}

/// Error type for publisher operations
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Authentication expired for {provider}, re-authentication required")]
    AuthExpired { provider: Provider },
    #[error("Content too long: {len} > {max}")]
    ContentTooLong { len: usize, max: usize },
    #[error("No linked {platform} account with an access token")]
    MissingCredentials { platform: Platform },
}

impl PublishError {
    /// Whether a retry can possibly succeed without user intervention
    pub fn is_retryable(&self) -> bool {
        match self {
            PublishError::Api { .. } | PublishError::Network(_) | PublishError::RateLimited => true,
            PublishError::AuthExpired { .. }
            | PublishError::ContentTooLong { .. }
            | PublishError::MissingCredentials { .. } => false,
        }
    }
}

/// Port for publishing a post to one social platform.
///
/// Publishers shape the platform request and parse the response; they never
/// write post status. The orchestrator owns the single status write path.
#[async_trait]
pub trait SocialPublisher: Send + Sync {
    /// Deliver the post using the linked account's credentials
    async fn publish(&self, post: &Post, account: &Account)
        -> Result<PublishReceipt, PublishError>;

    /// The platform this publisher delivers to
    fn platform(&self) -> Platform;
}

/// Error type for the draft generation gateway
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Gateway API error: {0}")]
    Api(String),
    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Timeout")]
    Timeout,
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Port for the generative-AI draft gateway
#[async_trait]
pub trait DraftGenerator: Send + Sync {
    /// Produce a platform-tailored draft from raw note content
    async fn generate(&self, content: &str, platform: Platform) -> Result<Draft, GenerateError>;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
