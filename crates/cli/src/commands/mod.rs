//! Command implementations

pub mod auth;
pub mod config;
pub mod doctor;
pub mod generate;
pub mod note;
pub mod post;
pub mod run;

use anyhow::{Context, Result, bail};
use devshare_adapters::generator::{DEFAULT_PROMPT_TEMPLATE, HttpDraftGenerator, StubDraftGenerator};
use devshare_adapters::social::{BlueskyPublisher, LinkedInPublisher, XPublisher};
use devshare_adapters::store::SqliteStore;
use devshare_domain::{DraftGenerator, Platform, SocialPublisher, User};
use secrecy::SecretString;
use std::sync::Arc;

use crate::config::AppConfig;

/// Open the SQLite store at the configured path
pub(crate) async fn open_store(config: &AppConfig) -> Result<Arc<SqliteStore>> {
    let store = SqliteStore::new(&config.general.db_path)
        .await
        .with_context(|| {
            format!(
                "Failed to open database: {}",
                config.general.db_path.display()
            )
        })?;
    Ok(Arc::new(store))
}

/// Resolve the local user from `general.user_email`, creating it on first use
pub(crate) async fn resolve_user(store: &SqliteStore, config: &AppConfig) -> Result<User> {
    use devshare_domain::PostStore;

    let email = config.general.user_email.trim();
    if email.is_empty() {
        bail!("general.user_email is not configured. Run 'devshare config init' and edit it.");
    }

    store
        .upsert_user(email, None)
        .await
        .context("Failed to resolve user")
}

/// Build publishers for enabled platforms
pub(crate) fn build_publishers(config: &AppConfig) -> Vec<Arc<dyn SocialPublisher>> {
    let mut publishers: Vec<Arc<dyn SocialPublisher>> = Vec::new();

    if config.linkedin.enabled {
        publishers.push(Arc::new(LinkedInPublisher::with_base_url(
            config.linkedin.base_url.clone(),
        )));
    }

    if config.x.enabled {
        publishers.push(Arc::new(XPublisher::with_base_url(
            config.x.api_base_url.clone(),
        )));
    }

    if config.bluesky.enabled {
        publishers.push(Arc::new(BlueskyPublisher::new()));
    }

    publishers
}

/// Build the draft generator per configuration
pub(crate) fn build_generator(config: &AppConfig) -> Result<Arc<dyn DraftGenerator>> {
    match config.generator.provider.as_str() {
        "stub" => Ok(Arc::new(StubDraftGenerator::new())),
        "http" => {
            if config.generator.endpoint.trim().is_empty() {
                bail!("generator.endpoint is required when generator.provider = \"http\"");
            }

            let api_key = load_api_key(&config.generator.api_key_env, "generator")?;
            let template = config
                .generator
                .prompt_template
                .clone()
                .unwrap_or_else(|| DEFAULT_PROMPT_TEMPLATE.to_string());

            Ok(Arc::new(HttpDraftGenerator::new(
                config.generator.endpoint.clone(),
                api_key,
                template,
                config.generator.timeout_secs,
            )))
        }
        other => bail!("Unknown generator provider: {}", other),
    }
}

pub(crate) fn load_api_key(env_var: &str, provider: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("No API key env var configured for provider {}", provider);
    }

    let key = std::env::var(env_var).with_context(|| {
        format!(
            "Missing API key env var {} for provider {}",
            env_var, provider
        )
    })?;

    if key.trim().is_empty() {
        bail!("API key env var {} is set but empty", env_var);
    }

    Ok(SecretString::new(key.into()))
}

/// Parse platform names from the CLI; empty input means all platforms
pub(crate) fn parse_platforms(names: &[String]) -> Result<Vec<Platform>> {
    if names.is_empty() {
        return Ok(Platform::ALL.to_vec());
    }

    names
        .iter()
        .map(|name| {
            name.parse::<Platform>()
                .map_err(|_| anyhow::anyhow!("Unknown platform: {}", name))
        })
        .collect()
}
