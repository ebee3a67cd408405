//! Configuration loading and management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub generator: GeneratorConfig,

    #[serde(default)]
    pub linkedin: LinkedInConfig,

    #[serde(default)]
    pub x: XConfig,

    #[serde(default)]
    pub bluesky: BlueskyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Email identifying the local user; created on first use
    #[serde(default)]
    pub user_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// "stub" or "http"
    #[serde(default = "default_generator_provider")]
    pub provider: String,

    #[serde(default)]
    pub endpoint: String,

    #[serde(default = "default_generator_api_key_env")]
    pub api_key_env: String,

    #[serde(default)]
    pub prompt_template: Option<String>,

    #[serde(default = "default_generator_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedInConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_linkedin_base_url")]
    pub base_url: String,

    /// Env var holding the LinkedIn access token for `auth linkedin-token`
    #[serde(default = "default_linkedin_token_env")]
    pub access_token_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub client_id: String,

    #[serde(default = "default_x_redirect_uri")]
    pub redirect_uri: String,

    #[serde(default = "default_x_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_x_auth_base_url")]
    pub auth_base_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlueskyConfig {
    #[serde(default)]
    pub enabled: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./devshare.sqlite")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_interval() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay() -> u64 {
    5
}

fn default_generator_provider() -> String {
    "stub".to_string()
}

fn default_generator_api_key_env() -> String {
    "DEVSHARE_GATEWAY_API_KEY".to_string()
}

fn default_generator_timeout() -> u64 {
    45
}

fn default_linkedin_base_url() -> String {
    "https://api.linkedin.com".to_string()
}

fn default_linkedin_token_env() -> String {
    "DEVSHARE_LINKEDIN_TOKEN".to_string()
}

fn default_x_redirect_uri() -> String {
    "http://localhost:3000/callback".to_string()
}

fn default_x_api_base_url() -> String {
    "https://api.twitter.com".to_string()
}

fn default_x_auth_base_url() -> String {
    "https://twitter.com".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_level: default_log_level(),
            user_email: String::new(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: default_generator_provider(),
            endpoint: String::new(),
            api_key_env: default_generator_api_key_env(),
            prompt_template: None,
            timeout_secs: default_generator_timeout(),
        }
    }
}

impl Default for LinkedInConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_linkedin_base_url(),
            access_token_env: default_linkedin_token_env(),
        }
    }
}

impl Default for XConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            client_id: String::new(),
            redirect_uri: default_x_redirect_uri(),
            api_base_url: default_x_api_base_url(),
            auth_base_url: default_x_auth_base_url(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("DEVSHARE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# devshare configuration

[general]
db_path = "./devshare.sqlite"
log_level = "info"
user_email = "you@example.com"

[scheduler]
poll_interval_secs = 60
max_retries = 2
retry_delay_secs = 5

[generator]
provider = "stub"  # stub, http
# endpoint = "https://your-gateway.example.com/generate"
api_key_env = "DEVSHARE_GATEWAY_API_KEY"
timeout_secs = 45
# prompt_template = "Write a %%platform%% post about: %%content%%"

[linkedin]
enabled = true
base_url = "https://api.linkedin.com"
access_token_env = "DEVSHARE_LINKEDIN_TOKEN"
# Link with: devshare auth linkedin-token --member-id <id>

[x]
enabled = true
client_id = ""
redirect_uri = "http://localhost:3000/callback"
api_base_url = "https://api.twitter.com"
auth_base_url = "https://twitter.com"

[bluesky]
enabled = false
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = AppConfig::default();
        assert_eq!(config.scheduler.poll_interval_secs, 60);
        assert_eq!(config.scheduler.max_retries, 2);
        assert_eq!(config.scheduler.retry_delay_secs, 5);
        assert_eq!(config.generator.provider, "stub");
        assert!(config.linkedin.enabled);
        assert!(!config.bluesky.enabled);
    }

    #[test]
    fn example_toml_parses() {
        let config: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();
        assert_eq!(config.general.user_email, "you@example.com");
        assert_eq!(config.general.db_path, PathBuf::from("./devshare.sqlite"));
        assert!(!config.bluesky.enabled);
    }
}
