//! Domain models and value objects

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

/// Target platform for a social post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Linkedin,
    Twitter,
    Bluesky,
}

impl Platform {
    /// All known platforms
    pub const ALL: [Platform; 3] = [Platform::Linkedin, Platform::Twitter, Platform::Bluesky];

    /// Maximum post length accepted by the platform
    pub fn max_chars(&self) -> usize {
        match self {
            Platform::Linkedin => 3000,
            Platform::Twitter => 280,
            Platform::Bluesky => 300,
        }
    }

    /// The credential provider whose linked account publishes to this platform
    pub fn provider(&self) -> Provider {
        match self {
            Platform::Linkedin => Provider::Linkedin,
            Platform::Twitter => Provider::Twitter,
            Platform::Bluesky => Provider::Bluesky,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Platform::Linkedin => "linkedin",
            Platform::Twitter => "twitter",
            Platform::Bluesky => "bluesky",
        };
        f.write_str(s)
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linkedin" => Ok(Platform::Linkedin),
            "twitter" | "x" => Ok(Platform::Twitter),
            "bluesky" => Ok(Platform::Bluesky),
            other => Err(format!("Unknown platform: {}", other)),
        }
    }
}

/// External identity provider for a linked account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Google,
    Linkedin,
    Twitter,
    Bluesky,
    Email,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Provider::Google => "google",
            Provider::Linkedin => "linkedin",
            Provider::Twitter => "twitter",
            Provider::Bluesky => "bluesky",
            Provider::Email => "email",
        };
        f.write_str(s)
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            "linkedin" => Ok(Provider::Linkedin),
            "twitter" | "x" => Ok(Provider::Twitter),
            "bluesky" => Ok(Provider::Bluesky),
            "email" => Ok(Provider::Email),
            other => Err(format!("Unknown provider: {}", other)),
        }
    }
}

/// Post lifecycle status
///
/// `Publishing` is the claim state: an orchestrator instance that wins the
/// compare-and-set holds the post while it attempts delivery. Terminal state
/// for the automatic flow is `Published`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    Scheduled,
    Publishing,
    Published,
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PostStatus::Draft => "draft",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Publishing => "publishing",
            PostStatus::Published => "published",
        };
        f.write_str(s)
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "scheduled" => Ok(PostStatus::Scheduled),
            "publishing" => Ok(PostStatus::Publishing),
            "published" => Ok(PostStatus::Published),
            other => Err(format!("Unknown post status: {}", other)),
        }
    }
}

/// An application user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Signup/upsert key
    pub email: String,
    pub display_name: Option<String>,
    /// Present only for email/password auth
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A linked external account (one per provider per user)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: Provider,
    /// Opaque external identifier, unique per provider
    pub provider_account_id: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A free-form learning note, the raw material posts are generated from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    /// Soft delete; notes are never physically removed
    pub is_deleted: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A platform-specific post derived from a note
///
/// `user_id` duplicates `note.user_id` for query convenience, matching the
/// store schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub note_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub platform: Platform,
    pub status: PostStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub scheduled_for: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    /// Platform-side id of the published post, when the platform returns one
    pub external_id: Option<String>,
    pub external_url: Option<String>,
    pub is_deleted: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Post {
    /// Build a new draft post for a note
    pub fn new_draft(
        note_id: Uuid,
        user_id: Uuid,
        platform: Platform,
        content: String,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            note_id,
            user_id,
            content,
            platform,
            status: PostStatus::Draft,
            scheduled_for: None,
            published_at: None,
            external_id: None,
            external_url: None,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A generated draft for one platform, as returned by the AI gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub content: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    pub platform: Platform,
}

/// Normalized result of a successful publish call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub platform: Platform,
    pub external_id: Option<String>,
    pub url: Option<String>,
}

/// Validation errors raised at post creation/scheduling time
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Scheduled time {at} is not in the future")]
    ScheduleInPast { at: OffsetDateTime },
    #[error("Content too long for {platform}: {len} > {max}")]
    ContentTooLong {
        platform: Platform,
        len: usize,
        max: usize,
    },
    #[error("Content is empty")]
    EmptyContent,
}

/// Reject schedule timestamps that are not strictly in the future.
///
/// Enforced only at creation/scheduling time; an already-persisted schedule
/// that becomes due as time passes is valid and publishes normally.
pub fn validate_schedule(at: OffsetDateTime, now: OffsetDateTime) -> Result<(), ValidationError> {
    if at <= now {
        return Err(ValidationError::ScheduleInPast { at });
    }
    Ok(())
}

/// Validate post content against the platform's length limit
pub fn validate_content(platform: Platform, content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    let len = content.chars().count();
    let max = platform.max_chars();
    if len > max {
        return Err(ValidationError::ContentTooLong { platform, len, max });
    }
    Ok(())
}
