//! Auth command - link social accounts via OAuth

use anyhow::{Result, bail};
use devshare_adapters::oauth::{
    STATE_TTL, XOauthClient, code_challenge, generate_state, generate_verifier,
};
use devshare_domain::{Account, PkceStore, PostStore, Provider};
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::args::{AuthArgs, AuthCommands};
use crate::commands::{load_api_key, open_store, resolve_user};
use crate::config::AppConfig;

pub async fn execute(args: AuthArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let store = open_store(&config).await?;

    match args.command {
        AuthCommands::LinkedinToken { member_id } => {
            link_linkedin(&config, &store, member_id).await
        }
        AuthCommands::XBegin => begin_x(&config, &store).await,
        AuthCommands::XComplete { code, state } => complete_x(&config, &store, code, state).await,
    }
}

async fn link_linkedin(
    config: &AppConfig,
    store: &devshare_adapters::store::SqliteStore,
    member_id: String,
) -> Result<()> {
    let user = resolve_user(store, config).await?;
    let token = load_api_key(&config.linkedin.access_token_env, "linkedin")?;

    let account = Account {
        id: Uuid::new_v4(),
        user_id: user.id,
        provider: Provider::Linkedin,
        provider_account_id: member_id.clone(),
        access_token: Some(token.expose_secret().to_string()),
        refresh_token: None,
        updated_at: OffsetDateTime::now_utc(),
    };
    store.upsert_account(&account).await?;

    println!("Linked LinkedIn account {} for {}", member_id, user.email);
    Ok(())
}

fn x_client(config: &AppConfig) -> Result<XOauthClient> {
    if config.x.client_id.trim().is_empty() {
        bail!("x.client_id is not configured");
    }

    Ok(XOauthClient::with_base_urls(
        config.x.client_id.clone(),
        config.x.redirect_uri.clone(),
        config.x.auth_base_url.clone(),
        config.x.api_base_url.clone(),
    ))
}

async fn begin_x(config: &AppConfig, store: &devshare_adapters::store::SqliteStore) -> Result<()> {
    let client = x_client(config)?;

    let verifier = generate_verifier();
    let state = generate_state();
    let challenge = code_challenge(&verifier);

    let expires_at = OffsetDateTime::now_utc() + STATE_TTL;
    store.put_state(&state, &verifier, expires_at).await?;

    let url = client.authorize_url(&state, &challenge)?;

    println!("Open this URL in your browser to authorize:");
    println!();
    println!("  {}", url);
    println!();
    println!("After approving, copy the 'code' and 'state' query parameters");
    println!("from the callback URL and run:");
    println!();
    println!("  devshare auth x-complete --code <code> --state <state>");

    Ok(())
}

async fn complete_x(
    config: &AppConfig,
    store: &devshare_adapters::store::SqliteStore,
    code: String,
    state: String,
) -> Result<()> {
    let client = x_client(config)?;
    let user = resolve_user(store, config).await?;

    let Some(verifier) = store.take_state(&state, OffsetDateTime::now_utc()).await? else {
        bail!("Unknown or expired authorization state. Run 'devshare auth x-begin' again.");
    };

    let tokens = client.exchange_code(&code, &verifier).await?;
    let access_token = SecretString::new(tokens.access_token.clone().into());
    let provider_account_id = client.fetch_user_id(&access_token).await?;

    let account = Account {
        id: Uuid::new_v4(),
        user_id: user.id,
        provider: Provider::Twitter,
        provider_account_id: provider_account_id.clone(),
        access_token: Some(tokens.access_token),
        refresh_token: tokens.refresh_token,
        updated_at: OffsetDateTime::now_utc(),
    };
    store.upsert_account(&account).await?;

    println!("Linked X account {} for {}", provider_account_id, user.email);
    Ok(())
}
