//! X OAuth 2.0 authorization-code flow with PKCE
//!
//! The code verifier is held in the shared store (`PkceStore`) keyed by the
//! `state` parameter, with an expiry, so any instance can complete the
//! callback.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;

/// How long a pending authorization stays completable
pub const STATE_TTL: time::Duration = time::Duration::minutes(10);

/// Scopes requested for publishing on the user's behalf
const SCOPES: &str = "tweet.read tweet.write users.read offline.access";

/// Generate a random PKCE code verifier (43 url-safe chars)
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a random OAuth state parameter
pub fn generate_state() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// S256 code challenge for a verifier (RFC 7636)
pub fn code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Errors from the OAuth client
#[derive(Debug, Error)]
pub enum OauthError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Token endpoint returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Tokens returned by a successful code exchange
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct MeResponse {
    data: MeData,
}

#[derive(Deserialize)]
struct MeData {
    id: String,
}

/// Client for the X OAuth 2.0 endpoints
pub struct XOauthClient {
    client: Client,
    auth_base_url: String,
    api_base_url: String,
    client_id: String,
    redirect_uri: String,
}

impl XOauthClient {
    pub fn new(client_id: String, redirect_uri: String) -> Self {
        Self::with_base_urls(
            client_id,
            redirect_uri,
            "https://twitter.com".to_string(),
            "https://api.twitter.com".to_string(),
        )
    }

    pub fn with_base_urls(
        client_id: String,
        redirect_uri: String,
        auth_base_url: String,
        api_base_url: String,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            auth_base_url,
            api_base_url,
            client_id,
            redirect_uri,
        }
    }

    /// Build the authorization redirect URL for a pending state/challenge
    pub fn authorize_url(&self, state: &str, challenge: &str) -> Result<String, OauthError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/i/oauth2/authorize", self.auth_base_url),
            &[
                ("response_type", "code"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", SCOPES),
                ("state", state),
                ("code_challenge", challenge),
                ("code_challenge_method", "S256"),
            ],
        )
        .map_err(|e| OauthError::InvalidResponse(e.to_string()))?;

        Ok(url.into())
    }

    /// Exchange an authorization code plus its verifier for tokens
    pub async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
    ) -> Result<TokenResponse, OauthError> {
        let response = self
            .client
            .post(format!("{}/2/oauth2/token", self.api_base_url))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("code_verifier", verifier),
            ])
            .send()
            .await
            .map_err(|e| OauthError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OauthError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| OauthError::InvalidResponse(e.to_string()))
    }

    /// Fetch the authenticated user's X id, used as the provider account id
    pub async fn fetch_user_id(&self, access_token: &SecretString) -> Result<String, OauthError> {
        let response = self
            .client
            .get(format!("{}/2/users/me", self.api_base_url))
            .header(
                "Authorization",
                format!("Bearer {}", access_token.expose_secret()),
            )
            .send()
            .await
            .map_err(|e| OauthError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OauthError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let me: MeResponse = response
            .json()
            .await
            .map_err(|e| OauthError::InvalidResponse(e.to_string()))?;

        Ok(me.data.id)
    }
}
