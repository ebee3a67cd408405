//! Per-platform publish adapters
//!
//! Each adapter shapes the platform's request from a post and a linked
//! account, and maps HTTP failures to typed `PublishError`s. Adapters never
//! write post status; the orchestrator owns that.

pub mod bluesky;
pub mod linkedin;
pub mod twitter;

pub use bluesky::BlueskyPublisher;
pub use linkedin::LinkedInPublisher;
pub use twitter::XPublisher;

use devshare_domain::{Account, Platform, PublishError};

/// Pull the bearer token off a linked account, or fail as missing credentials
pub(crate) fn bearer_token<'a>(
    account: &'a Account,
    platform: Platform,
) -> Result<&'a str, PublishError> {
    account
        .access_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or(PublishError::MissingCredentials { platform })
}
